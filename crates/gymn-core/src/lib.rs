// ABOUTME: Core types and constants for the Gymn affiliation server
// ABOUTME: Foundation crate with error handling, domain models, and validation rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

#![deny(unsafe_code)]

//! # Gymn Core
//!
//! Foundation crate providing shared types for the Gymn gym affiliation
//! server. It carries no I/O: persistence, HTTP and configuration live in the
//! `gymn_server` crate.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `DatabaseError`
//! - **constants**: Validation limits and user-facing error texts
//! - **models**: Accounts, gyms, affiliations and their state
//! - **validation**: Form rules shared by registration, invites and profile edits

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Validation limits and user-facing error texts
pub mod constants;

/// Core data models (Account, Gym, Affiliation)
pub mod models;

/// Input validation rules for usernames, passwords, emails and names
pub mod validation;
