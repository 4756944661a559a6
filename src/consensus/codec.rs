use thiserror::Error;

use super::{
    message::{Block, Message, MessageKind, Vote},
    peers::ConsensusRole,
    qc::QuorumCertificate,
};

/*
    Wire format, all fields positional and pipe-delimited:

        QC:     <view>|<height>|<node_hash>|<sig1>,<sig2>,...
        Block:  <hash>|<parent_hash>|<command>|<height>|<QC>
        Vote:   <kind>|<signature>|<Block>

    Block and NEW_VIEW messages are the kind digit immediately followed by
    the encoding. Decoding is total: missing trailing fields come back empty
    or zero, unparsable numbers come back zero.

    Commands are carried verbatim, so a command may not contain '|', ','
    or NUL. Replicas refuse such commands at submission.
*/

const FIELD: char = '|';
const SIG: &str = ",";
const PAD: u8 = 0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("command {command:?} contains reserved character {reserved:?}")]
    ReservedCharacter { command: String, reserved: char },
}

/// Reject commands that would not survive the block encoding.
pub fn check_command(command: &str) -> Result<(), CommandError> {
    let reserved = command
        .chars()
        .find(|&c| c == FIELD || SIG.contains(c) || c == char::from(PAD));
    match reserved {
        Some(reserved) => Err(CommandError::ReservedCharacter {
            command: command.to_string(),
            reserved,
        }),
        None => Ok(()),
    }
}

pub fn encode_qc(qc: &QuorumCertificate) -> String {
    format!(
        "{}{FIELD}{}{FIELD}{}{FIELD}{}",
        qc.view,
        qc.height,
        qc.node_hash,
        qc.signatures.join(SIG)
    )
}

pub fn decode_qc(data: &str) -> QuorumCertificate {
    let mut fields = data.splitn(4, FIELD);
    let view = parse_number(fields.next());
    let height = parse_number(fields.next());
    let node_hash = fields.next().unwrap_or_default().to_string();
    let signatures = match fields.next() {
        Some(sigs) if !sigs.is_empty() => sigs.split(SIG).map(str::to_string).collect(),
        _ => Vec::new(),
    };

    QuorumCertificate {
        view,
        height,
        node_hash,
        signatures,
    }
}

pub fn encode_block(block: &Block) -> String {
    format!(
        "{}{FIELD}{}{FIELD}{}{FIELD}{}{FIELD}{}",
        block.hash,
        block.parent_hash,
        block.command,
        block.height,
        encode_qc(&block.justify)
    )
}

pub fn decode_block(data: &str) -> Block {
    let mut fields = data.splitn(5, FIELD);
    let hash = fields.next().unwrap_or_default().to_string();
    let parent_hash = fields.next().unwrap_or_default().to_string();
    let command = fields.next().unwrap_or_default().to_string();
    let height = parse_number(fields.next());
    let justify = fields.next().map(decode_qc).unwrap_or_default();

    Block {
        hash,
        parent_hash,
        command,
        height,
        justify,
    }
}

pub fn encode_message(message: &Message) -> Vec<u8> {
    let kind = message.kind().digit() as char;
    let body = match message {
        Message::NewView(qc) => encode_qc(qc),
        Message::Proposal(_, block) => encode_block(block),
        Message::Vote(vote) => format!(
            "{FIELD}{}{FIELD}{}",
            vote.signature,
            encode_block(&vote.block)
        ),
    };
    format!("{kind}{body}").into_bytes()
}

/// Decode a message as seen by a replica in `role`.
///
/// PRECOMMIT and COMMIT carry votes when they arrive at the leader and
/// blocks when they arrive anywhere else. Returns `None` only for an empty
/// payload or an unknown kind digit.
pub fn decode_message(payload: &[u8], role: ConsensusRole) -> Option<Message> {
    let (&digit, rest) = payload.split_first()?;
    let kind = MessageKind::from_digit(digit)?;
    let text = String::from_utf8_lossy(rest);
    let body: &str = &text;

    let message = match kind {
        MessageKind::NewView => Message::NewView(decode_qc(body)),
        MessageKind::PreCommit | MessageKind::Commit if role == ConsensusRole::Leader => {
            let body = body.strip_prefix(FIELD).unwrap_or(body);
            let (signature, block) = body.split_once(FIELD).unwrap_or((body, ""));
            Message::Vote(Vote {
                kind,
                signature: signature.to_string(),
                block: decode_block(block),
            })
        }
        _ => Message::Proposal(kind, decode_block(body)),
    };
    Some(message)
}

/// Pad with NUL bytes or truncate so the payload is exactly `tx_size` bytes.
pub fn frame(mut payload: Vec<u8>, tx_size: usize) -> Vec<u8> {
    payload.resize(tx_size, PAD);
    payload
}

/// Strip the padding added by [`frame`].
pub fn unframe(payload: &[u8]) -> &[u8] {
    let end = payload
        .iter()
        .rposition(|&b| b != PAD)
        .map_or(0, |last| last + 1);
    &payload[..end]
}

fn parse_number(field: Option<&str>) -> u64 {
    field.and_then(|f| f.trim().parse().ok()).unwrap_or(0)
}
