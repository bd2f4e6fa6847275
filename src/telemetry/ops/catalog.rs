use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Catalog;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Load, Shape, DeriveFacets, Filter, Paginate, Output }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Load => "load",
        Phase::Shape => "shape",
        Phase::DeriveFacets => "derive_facets",
        Phase::Filter => "filter",
        Phase::Paginate => "paginate",
        Phase::Output => "output",
    }}
    fn span(&self) -> Span { match self {
        Phase::Load => info_span!("load"),
        Phase::Shape => info_span!("shape"),
        Phase::DeriveFacets => info_span!("derive_facets"),
        Phase::Filter => info_span!("filter"),
        Phase::Paginate => info_span!("paginate"),
        Phase::Output => info_span!("output"),
    }}
}

impl OpMarker for Catalog {
    const NAME: &'static str = "catalog";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("catalog") }
}
