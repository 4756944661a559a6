/*
    HotStuff solves the State Machine Replication (SMR) problem. Replicas
    agree on a growing chain of command blocks. A leader proposes blocks and
    collects votes into quorum certificates (QCs); replicas lock on
    pre-committed blocks and execute commands once a block is decided.

    This crate runs the chained variant with a fixed leader (replica 0) and
    a QC-view driven phase cycle, over an in-process simulated network.
*/

pub mod common;
pub mod config;
pub mod consensus;
pub mod network;
