use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Fetch;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Bootstrap, Plan, Page, Backoff, Dedup, Write }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Bootstrap => "bootstrap",
        Phase::Plan => "plan",
        Phase::Page => "page",
        Phase::Backoff => "backoff",
        Phase::Dedup => "dedup",
        Phase::Write => "write",
    }}
    fn span(&self) -> Span { match self {
        Phase::Bootstrap => info_span!("bootstrap"),
        Phase::Plan => info_span!("plan"),
        Phase::Page => info_span!("page"),
        Phase::Backoff => info_span!("backoff"),
        Phase::Dedup => info_span!("dedup"),
        Phase::Write => info_span!("write"),
    }}
}

impl OpMarker for Fetch {
    const NAME: &'static str = "fetch";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("fetch") }
}
