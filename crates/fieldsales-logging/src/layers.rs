//! Custom tracing layers
//!
//! [`SessionContextLayer`] attaches the active session context to every new
//! span so exporters and the JSON formatter can pick it up.

use tracing::{Subscriber, span};
use tracing_subscriber::{
    layer::{Context, Layer},
    registry::LookupSpan,
};

use crate::context::{SessionContextData, SessionContextGuard};

/// Layer that attaches session context to spans
pub struct SessionContextLayer;

impl SessionContextLayer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SessionContextLayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone)]
pub struct SessionContextExtension {
    pub data: SessionContextData,
}

impl<S> Layer<S> for SessionContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(session) = SessionContextGuard::current() {
                span.extensions_mut()
                    .insert(SessionContextExtension { data: session });
            }
        }
    }
}

/// Look up the session context recorded on a span or its nearest ancestor
pub fn session_for_span<S>(ctx: &Context<'_, S>, id: &span::Id) -> Option<SessionContextData>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    let span = ctx.span(id)?;
    span.scope().find_map(|s| {
        s.extensions()
            .get::<SessionContextExtension>()
            .map(|ext| ext.data.clone())
    })
}
