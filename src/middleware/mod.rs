// ABOUTME: HTTP middleware for session authentication and cross-origin access
// ABOUTME: Token extraction from headers/cookies and CORS layer construction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

/// Session authentication from headers and cookies
pub mod auth;
/// CORS layer construction
pub mod cors;

pub use auth::{authenticate, get_cookie_value, session_token, AuthenticatedAccount};
pub use cors::setup_cors;
