//! Effective value of a field
//!
//! A linked field shows its dataset cell; its own stored value is ignored,
//! whether or not the field was overridden. An unlinked field shows its
//! stored value.

use property_value::Value;

use crate::link::{Links, ResolveError, Resolver};

/// Resolve the value a reader sees.
///
/// `links` must already be bound to the row context (see
/// [`Links::bind_row`]). Not found anywhere along the chain yields `Ok(None)`;
/// only resolver I/O failures are errors. `overridden` never changes the
/// outcome and is accepted so callers can pass a merged field through as is.
pub fn resolve<R: Resolver + ?Sized>(
    resolver: &R,
    raw: Option<Value>,
    links: &Links,
    _overridden: bool,
) -> Result<Option<Value>, ResolveError> {
    if links.is_empty() {
        return Ok(raw);
    }

    let mut current: Option<Value> = None;
    for index in 0..links.len() {
        let Some(cell) = links.cell_at(index, current.as_ref()) else {
            return Ok(None);
        };
        match resolver.resolve_cell(&cell)? {
            Some(value) => current = Some(value),
            None => return Ok(None),
        }
    }
    Ok(current)
}
