//! Cloudstash Core - Domain logic and backup rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `BackupEntry`, `RemoteNode`, `Fingerprint`, `BackupRun`
//! - **Use cases** - `ChangeDetector`, `RemoteFolderResolver`, `RemoteFileUploader`, `SyncSession`
//! - **Port definitions** - Traits for adapters: `IRemoteStore`, `IFingerprintStore`,
//!   `ILocalFileSystem`, `IProgressReporter`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure types with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
