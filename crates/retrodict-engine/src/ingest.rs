//! Trace and candidate ingestion
//!
//! The normalizer hands over JSON. Everything is validated before any graph
//! work starts; the first malformed record fails the whole batch.

use crate::EngineError;
use retrodict_domain::{ClaimTemplate, DomainError, Trace, TraceId};
use std::collections::BTreeMap;

/// Parse a JSON array of traces and validate each one
pub fn parse_traces(json: &str) -> Result<Vec<Trace>, EngineError> {
    let traces: Vec<Trace> = serde_json::from_str(json)?;
    for trace in &traces {
        trace.validate()?;
    }
    Ok(traces)
}

/// Parse a JSON array of candidate claim templates
pub fn parse_templates(json: &str) -> Result<Vec<ClaimTemplate>, EngineError> {
    Ok(serde_json::from_str(json)?)
}

/// Validate traces and index them by id
///
/// Duplicate ids are malformed input, as is any trace failing
/// [`Trace::validate`].
pub fn trace_pool<I>(traces: I) -> Result<BTreeMap<TraceId, Trace>, EngineError>
where
    I: IntoIterator<Item = Trace>,
{
    let mut pool = BTreeMap::new();
    for trace in traces {
        trace.validate()?;
        if pool.contains_key(&trace.id) {
            return Err(DomainError::MalformedTrace {
                trace: trace.id.to_string(),
                issue: "duplicate trace id".to_string(),
            }
            .into());
        }
        pool.insert(trace.id.clone(), trace);
    }
    Ok(pool)
}

/// Fold new traces into an existing pool
///
/// Re-sending an identical trace is a no-op; a different trace under a
/// known id is malformed. Returns the ids that were actually added. The
/// pool is untouched on error.
pub fn extend_pool(
    pool: &mut BTreeMap<TraceId, Trace>,
    traces: &[Trace],
) -> Result<Vec<TraceId>, EngineError> {
    let mut fresh: BTreeMap<TraceId, &Trace> = BTreeMap::new();
    for trace in traces {
        trace.validate()?;
        let known = pool.get(&trace.id).or_else(|| fresh.get(&trace.id).copied());
        match known {
            Some(existing) if existing == trace => continue,
            Some(_) => {
                return Err(DomainError::MalformedTrace {
                    trace: trace.id.to_string(),
                    issue: "conflicts with an existing trace of the same id".to_string(),
                }
                .into())
            }
            None => {
                fresh.insert(trace.id.clone(), trace);
            }
        }
    }
    let added: Vec<TraceId> = fresh.keys().cloned().collect();
    for (id, trace) in fresh {
        pool.insert(id, trace.clone());
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrodict_domain::{ProvenanceEntry, SubstrateType, TimeEstimate};

    fn trace(id: &str, quality: f64) -> Trace {
        Trace::new(
            id,
            SubstrateType::Physical,
            ProvenanceEntry::new("dig", 0, "excavation"),
            TimeEstimate::interval(-1200.0, -1180.0),
            quality,
        )
    }

    #[test]
    fn test_parse_traces_roundtrip() {
        let json = serde_json::to_string(&vec![trace("a", 0.8), trace("b", 0.6)]).unwrap();
        let traces = parse_traces(&json).unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[1].id, TraceId::new("b"));
    }

    #[test]
    fn test_parse_traces_rejects_bad_quality() {
        let json = serde_json::to_string(&vec![trace("a", 1.7)]).unwrap();
        let err = parse_traces(&json).unwrap_err();
        assert_eq!(err.reason_code(), Some(retrodict_domain::ReasonCode::MalformedTrace));
    }

    #[test]
    fn test_parse_traces_rejects_missing_fields() {
        let err = parse_traces(r#"[{"id": "a"}]"#).unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }

    #[test]
    fn test_trace_pool_rejects_duplicates() {
        let err = trace_pool(vec![trace("a", 0.8), trace("a", 0.7)]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(DomainError::MalformedTrace { .. })
        ));
    }

    #[test]
    fn test_extend_pool() {
        let mut pool = trace_pool(vec![trace("a", 0.8)]).unwrap();
        let added = extend_pool(&mut pool, &[trace("a", 0.8), trace("b", 0.5)]).unwrap();
        assert_eq!(added, vec![TraceId::new("b")]);
        assert_eq!(pool.len(), 2);

        let before = pool.clone();
        assert!(extend_pool(&mut pool, &[trace("c", 0.5), trace("a", 0.1)]).is_err());
        assert_eq!(pool, before);
    }
}
