//! Stagecast Server
//!
//! Backend for ephemeral live broadcast rooms: room directory, participant
//! rosters, and the SFU-style transport/producer lifecycle that lets
//! browsers exchange real-time audio and video through a central relay.

pub mod api;
pub mod config;
pub mod error;
pub mod media;
pub mod participants;
pub mod rooms;
