/*
 * alistback - backup and restore AList server configuration
 *
 * SPDX-FileCopyrightText: 2025-2026 Steve Schoettler
 * SPDX-License-Identifier: Apache-2.0
 */
//! Backup and restore of AList server configuration.
//!
//! - [backup](backup::backup) - fetch storages, settings, users, and metas into a [snapshot](snapshot::Snapshot)
//! - [restore](restore::restore) - recreate storages and users from a snapshot, then update the admin account
//! - [reset](reset::reset_admin_password) - set the admin password with the local server binary
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![warn(clippy::default_trait_access)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::future_not_send)]
#![warn(clippy::implicit_clone)]
#![warn(clippy::literal_string_with_formatting_args)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::option_if_let_else)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::ref_option)]
#![warn(clippy::redundant_closure)]
#![warn(clippy::uninlined_format_args)]
#![warn(clippy::unnecessary_wraps)]
#![warn(clippy::unused_async)]

pub mod backup;
pub mod cli;
pub mod reset;
pub mod restore;
pub mod snapshot;
