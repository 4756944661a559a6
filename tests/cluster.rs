use std::time::Duration;

use hotstuff_sim::{
    config::RunConfig,
    network::{Cluster, ClusterError, SignatureScheme},
};

async fn run(config: RunConfig, scheme: SignatureScheme, rounds: u64) -> Cluster {
    let cluster = Cluster::start(config, scheme).unwrap();
    for round in 1..=rounds {
        cluster.submit(format!("cmd-{round}")).await.unwrap();
    }
    cluster.run_rounds(rounds).await.unwrap();
    cluster
}

#[tokio::test(start_paused = true)]
async fn test_four_replicas_decide_on_views_two_and_five() {
    let cluster = run(RunConfig::new(4), SignatureScheme::Placeholder, 6).await;
    let report = cluster.report();

    assert!(report.all_reached_consensus());
    let committed = report.replicas[0].status.committed_qc.clone();
    assert!(committed.is_some());

    for replica in &report.replicas {
        // views 2 and 5 are the DECIDE views of the QC-view phase cycle
        assert_eq!(replica.executed, vec!["cmd-2", "cmd-5"]);
        assert_eq!(replica.status.committed_qc, committed);
    }

    let leader = &report.replicas[0].status;
    let tip = leader.last_proposal.clone().unwrap();
    assert_eq!(tip.height, 6);
    assert_eq!(tip.view, 6);

    for follower in &report.replicas[1..] {
        // view 6 is a PRECOMMIT view, so followers end locked on the tip
        assert_eq!(follower.status.locked_qc.as_deref(), Some(tip.hash.as_str()));
        assert_eq!(follower.status.metrics.latency_samples, 2);
        assert!(follower.status.metrics.average_latency() >= Duration::from_millis(2));
        assert_eq!(follower.status.metrics.messages_received, 12);
        assert_eq!(follower.status.metrics.messages_sent, 8);
    }
    cluster.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_seven_replicas_need_five_votes() {
    let cluster = run(RunConfig::new(7), SignatureScheme::Placeholder, 2).await;
    let report = cluster.report();

    assert!(report.all_reached_consensus());
    for replica in &report.replicas {
        assert_eq!(replica.executed, vec!["cmd-2"]);
    }
    cluster.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_ed25519_votes() {
    let cluster = run(RunConfig::new(4), SignatureScheme::Ed25519, 2).await;
    let report = cluster.report();

    assert!(report.all_reached_consensus());
    for replica in &report.replicas {
        assert_eq!(replica.executed, vec!["cmd-2"]);
    }
    cluster.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_missing_quorum_stalls() {
    // floor(2*3/3)+1 = 3 signatures, but only the two followers vote
    let cluster = run(RunConfig::new(3), SignatureScheme::Placeholder, 3).await;
    let report = cluster.report();

    for replica in &report.replicas {
        assert!(!replica.status.metrics.reached_consensus);
        assert!(replica.executed.is_empty());
        assert_eq!(replica.status.committed_qc, None);
    }
    // proposals still go out every view
    assert_eq!(report.replicas[0].status.last_proposal.as_ref().map(|b| b.height), Some(3));
    cluster.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_truncated_payloads_never_commit() {
    let config = RunConfig::new(4).with_tx_size(16);
    let cluster = run(config, SignatureScheme::Placeholder, 3).await;
    let report = cluster.report();

    assert!(!report.all_reached_consensus());
    for replica in &report.replicas {
        assert!(replica.executed.is_empty());
    }
    cluster.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_commands_are_proposed_in_submission_order() {
    let cluster = Cluster::start(RunConfig::new(4), SignatureScheme::Placeholder).unwrap();
    cluster.submit("first").await.unwrap();
    cluster.submit("second").await.unwrap();
    let report = cluster.run_rounds(2).await.unwrap();

    // view 1 carried "first", view 2 decides "second"
    for replica in &report.replicas {
        assert_eq!(replica.executed, vec!["second"]);
    }
    cluster.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_commands_with_separators_are_refused() {
    let cluster = Cluster::start(RunConfig::new(4), SignatureScheme::Placeholder).unwrap();
    assert!(matches!(
        cluster.submit("set a|b").await,
        Err(ClusterError::Command(_))
    ));
    cluster.submit("set a b").await.unwrap();
    let report = cluster.run_rounds(2).await.unwrap();

    // view 1 carried the only accepted command, view 2 an empty one
    for replica in &report.replicas {
        assert_eq!(replica.executed, vec![""]);
    }
    cluster.shutdown();
}
