pub type ReplicaId = usize;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConsensusRole {
    Leader,
    Follower,
}

/// Which replica leads a given view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaderElection {
    /// The same replica leads every view.
    Fixed(ReplicaId),
}

impl Default for LeaderElection {
    fn default() -> Self {
        LeaderElection::Fixed(0)
    }
}

impl LeaderElection {
    pub fn leader(&self, _view: u64) -> ReplicaId {
        match self {
            LeaderElection::Fixed(id) => *id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Peers {
    pub me: ReplicaId,
    pub members: Vec<ReplicaId>,
    pub election: LeaderElection,
}

impl Peers {
    /// Replicas `0..n`, seen from replica `me`.
    pub fn new(me: ReplicaId, n: usize) -> Self {
        Peers {
            me,
            members: (0..n).collect(),
            election: LeaderElection::default(),
        }
    }

    pub fn get_leader(&self, view: u64) -> ReplicaId {
        self.election.leader(view)
    }

    pub fn role(&self, view: u64) -> ConsensusRole {
        if self.get_leader(view) == self.me {
            ConsensusRole::Leader
        } else {
            ConsensusRole::Follower
        }
    }

    /// Every member except this replica.
    pub fn others(&self) -> impl Iterator<Item = ReplicaId> + '_ {
        self.members.iter().copied().filter(move |&id| id != self.me)
    }
}
