//! Authentication module for gatewarden-server
//!
//! This module handles credential verification and the account flows:
//! registration, login, logout, refresh and password reset.

pub mod handlers;
pub mod password;
mod service;

pub use service::{
    AuthService, AuthSession, ForgotPasswordInput, LoginInput, LogoutInput, RefreshInput,
    RegisterInput, ResetPasswordInput,
};
