//! Route gating for a navigation layer.
//!
//! Per navigation the guard ends in exactly one of: loading (no decision yet),
//! authorized (render), unauthenticated (sign-in) or unauthorized (fallback).
//! An authenticated identity whose role lacks a requirement is never sent to
//! sign-in.

use rolegate_auth::authorize;

use crate::config::SessionConfig;
use crate::session::SessionState;

/// What a guarded route demands of the active role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any authenticated session with an active role.
    Authenticated,
    Permission(String),
    Role(String),
    AnyRole(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Authorized,
    Unauthorized,
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render a neutral holding state.
    Loading,
    Render,
    RedirectToSignIn(String),
    RedirectToFallback(String),
}

impl GuardDecision {
    pub fn state(&self) -> GuardState {
        match self {
            GuardDecision::Loading => GuardState::Loading,
            GuardDecision::Render => GuardState::Authorized,
            GuardDecision::RedirectToSignIn(_) => GuardState::Unauthenticated,
            GuardDecision::RedirectToFallback(_) => GuardState::Unauthorized,
        }
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GuardDecision::RedirectToSignIn(to) | GuardDecision::RedirectToFallback(to) => Some(to),
            GuardDecision::Loading | GuardDecision::Render => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    requirement: Requirement,
    fallback: Option<String>,
}

impl RouteGuard {
    pub fn new(requirement: Requirement) -> Self {
        Self {
            requirement,
            fallback: None,
        }
    }

    pub fn authenticated() -> Self {
        Self::new(Requirement::Authenticated)
    }

    pub fn permission(code: impl Into<String>) -> Self {
        Self::new(Requirement::Permission(code.into()))
    }

    pub fn role(name: impl Into<String>) -> Self {
        Self::new(Requirement::Role(name.into()))
    }

    pub fn any_role<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Requirement::AnyRole(names.into_iter().map(Into::into).collect()))
    }

    /// Route for authenticated-but-unauthorized navigations.
    pub fn fallback(mut self, route: impl Into<String>) -> Self {
        self.fallback = Some(route.into());
        self
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    pub fn evaluate(&self, state: &SessionState, config: &SessionConfig) -> GuardDecision {
        if state.loading {
            return GuardDecision::Loading;
        }

        let Some(active) = state.active_role() else {
            return GuardDecision::RedirectToSignIn(config.sign_in_route.clone());
        };

        if active.is_named(&config.super_admin_role) {
            return GuardDecision::Render;
        }

        let satisfied = match &self.requirement {
            Requirement::Authenticated => true,
            Requirement::Permission(code) => {
                authorize::has_permission(Some(active), code, &config.super_admin_role)
            }
            Requirement::Role(name) => authorize::has_role(Some(active), name),
            Requirement::AnyRole(names) => authorize::has_any_role(Some(active), names.as_slice()),
        };

        if satisfied {
            GuardDecision::Render
        } else {
            let to = self
                .fallback
                .clone()
                .unwrap_or_else(|| config.default_fallback_route.clone());
            tracing::debug!(requirement = ?self.requirement, %to, "route requirement not met");
            GuardDecision::RedirectToFallback(to)
        }
    }
}
