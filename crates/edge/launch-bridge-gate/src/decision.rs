//! The gate's decision table, free of side effects.

/// What the gate does with an inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Hand the request to the application.
    PassThrough { clear_stale_cookie: bool },
    /// Start a login attempt carrying this launch context.
    InitiateLogin { launch_context: String },
    /// Send the browser to the "launch required" page.
    RequireLaunch,
}

/// Evaluate the decision table in order. An empty launch context counts as absent.
pub fn decide(
    has_session: bool,
    launch_context: Option<&str>,
    has_state_cookie: bool,
) -> GateDecision {
    if has_session {
        return GateDecision::PassThrough {
            clear_stale_cookie: has_state_cookie,
        };
    }

    match launch_context.filter(|ctx| !ctx.is_empty()) {
        Some(ctx) => GateDecision::InitiateLogin {
            launch_context: ctx.to_string(),
        },
        None => GateDecision::RequireLaunch,
    }
}
