use std::collections::BTreeMap;

use chrono::Utc;
use dwc_types::{FragmentId, FragmentType, ProvenanceFragment};

use crate::error::ProvenanceError;

/// Per-specimen chain discipline: holds `prev` and advances it after each
/// emission. The orchestrator owns one of these per specimen and threads
/// it through the specimen's pipeline steps (§4.6 step 3-4, §4.10).
#[derive(Debug, Default)]
pub struct ProvenanceChain {
    prev: Option<FragmentId>,
}

impl ProvenanceChain {
    #[must_use]
    pub fn new() -> Self {
        Self { prev: None }
    }

    #[must_use]
    pub fn current(&self) -> Option<&FragmentId> {
        self.prev.as_ref()
    }

    /// Build the next fragment in the chain, setting
    /// `previous_fragment_id = prev` and then advancing `prev` to the new
    /// fragment's id.
    #[allow(clippy::too_many_arguments)]
    pub fn next_fragment(
        &mut self,
        fragment_type: FragmentType,
        source_identifier: impl Into<String>,
        operation: impl Into<String>,
        agent_id: impl Into<String>,
        output_identifier: impl Into<String>,
        parameters: BTreeMap<String, serde_json::Value>,
        quality_metrics: BTreeMap<String, serde_json::Value>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<ProvenanceFragment, ProvenanceError> {
        let timestamp = Utc::now();
        let source_identifier = source_identifier.into();
        let operation = operation.into();
        let agent_id = agent_id.into();
        let output_identifier = output_identifier.into();

        let fragment_id = dwc_canon::fragment_id(
            fragment_type.as_str(),
            &source_identifier,
            &operation,
            &agent_id,
            &output_identifier,
            timestamp,
        )?;

        let fragment = ProvenanceFragment {
            fragment_id: fragment_id.clone(),
            fragment_type,
            source_identifier,
            operation,
            agent_id,
            output_identifier,
            timestamp,
            previous_fragment_id: self.prev.clone(),
            parameters,
            quality_metrics,
            metadata,
        };

        self.prev = Some(fragment_id);
        Ok(fragment)
    }
}
