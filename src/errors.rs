// ABOUTME: Error handling for the server crate
// ABOUTME: Re-exports the gymn-core error taxonomy so modules import it from one place
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! # Unified Error Handling System
//!
//! `AppError` carries an [`ErrorCode`] that fixes the HTTP status, a
//! user-facing title and description, and an optional source for logging.
//! Store failures arrive as [`DatabaseError`] and convert with `?`.

pub use gymn_core::errors::{
    AppError, AppResult, DatabaseError, ErrorCategory, ErrorCode, ErrorContext, ErrorResponse,
    ErrorResponseDetails,
};
