//! The operation processor: gathers anchored operations for a DID suffix,
//! orders them, runs them through the applier and renders the resolution
//! result.
//!
//! Resolution is a pure function of its inputs: the processor holds no
//! mutable state across calls and treats the store as read-only.

use crate::applier::OperationApplier;
use crate::error::Error;
use crate::registry::ProtocolRegistry;
use crate::resolution::{
    create_resolution_result, ResolutionModel, ResolutionOptions, ResolutionResult,
    TransformationInfo,
};
use crate::store::OperationStore;
use log::debug;
use sidetree_operations::{AnchoredOperation, OperationParser, OperationType};

pub struct OperationProcessor<S> {
    namespace: String,
    store: S,
    registry: ProtocolRegistry,
    unpublished_store: Option<Box<dyn OperationStore + Send + Sync>>,
}

/// Operations apply in (transaction time, published-before-unpublished,
/// transaction number) order.
fn sort_key(op: &AnchoredOperation) -> (u64, bool, u64) {
    (op.transaction_time, !op.is_published(), op.transaction_number)
}

impl<S: OperationStore> OperationProcessor<S> {
    pub fn new(namespace: impl Into<String>, store: S, registry: ProtocolRegistry) -> Self {
        OperationProcessor {
            namespace: namespace.into(),
            store,
            registry,
            unpublished_store: None,
        }
    }

    /// Also consult a store of operations that are not yet anchored.
    pub fn with_unpublished_operation_store(
        mut self,
        store: Box<dyn OperationStore + Send + Sync>,
    ) -> Self {
        self.unpublished_store = Some(store);
        self
    }

    /// Resolve the current (or requested historical) state of a DID suffix.
    pub fn resolve(
        &self,
        unique_suffix: &str,
        options: &ResolutionOptions,
    ) -> Result<ResolutionResult, Error> {
        let model = self.resolve_model(unique_suffix, options)?;
        Ok(self.render(unique_suffix, &model, Vec::new()))
    }

    /// Resolve a short or long form DID. A long-form DID whose suffix has
    /// no anchored operations resolves from its embedded initial state and
    /// is reported as unpublished.
    pub fn resolve_did(
        &self,
        did: &str,
        options: &ResolutionOptions,
    ) -> Result<ResolutionResult, Error> {
        let protocol = self.registry.current()?;
        let parser = OperationParser::new(protocol);
        let (short_did, initial_state) = parser.parse_did(&self.namespace, did)?;
        let unique_suffix = short_did
            .strip_prefix(self.namespace.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(&short_did)
            .to_string();

        let initial_state = match initial_state {
            None => return self.resolve(&unique_suffix, options),
            Some(initial_state) => initial_state,
        };

        // The embedded suffix data must actually derive the DID suffix.
        let create_op = parser.parse_create_operation(&initial_state, true)?;
        if create_op.unique_suffix != unique_suffix {
            return Err(Error::DidSuffixMismatch {
                expected: unique_suffix,
                actual: create_op.unique_suffix,
            });
        }

        let mut options = options.clone();
        options.additional_operations.push(AnchoredOperation {
            operation_type: OperationType::Create,
            unique_suffix: unique_suffix.clone(),
            operation_request: initial_state,
            transaction_time: 0,
            transaction_number: 0,
            protocol_version: protocol.genesis_time,
            canonical_reference: String::new(),
        });
        let model = self.resolve_model(&unique_suffix, &options)?;
        Ok(self.render(&unique_suffix, &model, vec![did.to_string()]))
    }

    fn render(
        &self,
        unique_suffix: &str,
        model: &ResolutionModel,
        equivalent_id: Vec<String>,
    ) -> ResolutionResult {
        let published = !model.published_operations.is_empty();
        let info = TransformationInfo {
            canonical_id: if published {
                Some(format!("{}:{}", self.namespace, unique_suffix))
            } else {
                None
            },
            equivalent_id,
            published,
        };
        create_resolution_result(model, &info)
    }

    fn resolve_model(
        &self,
        unique_suffix: &str,
        options: &ResolutionOptions,
    ) -> Result<ResolutionModel, Error> {
        let mut ops = self.store.get(unique_suffix).map_err(Error::Store)?;
        if let Some(unpublished_store) = &self.unpublished_store {
            ops.extend(unpublished_store.get(unique_suffix).map_err(Error::Store)?);
        }
        ops.extend(options.additional_operations.iter().cloned());
        ops.retain(|op| op.unique_suffix == unique_suffix);

        if let Some(version_time) = &options.version_time {
            let cutoff = chrono::DateTime::parse_from_rfc3339(version_time)
                .map_err(|_| Error::InvalidVersionTime(version_time.clone()))?
                .timestamp()
                .max(0) as u64;
            ops.retain(|op| op.transaction_time <= cutoff);
            if ops.is_empty() {
                return Err(Error::NoOperationsForVersionTime(version_time.clone()));
            }
        }

        ops.sort_by_key(sort_key);

        if let Some(version_id) = &options.version_id {
            let target = ops
                .iter()
                .find(|op| !version_id.is_empty() && &op.canonical_reference == version_id)
                .map(sort_key)
                .ok_or_else(|| Error::InvalidVersionId(version_id.clone()))?;
            ops.retain(|op| sort_key(op) <= target);
        }

        let published: Vec<AnchoredOperation> =
            ops.iter().filter(|op| op.is_published()).cloned().collect();
        let unpublished: Vec<AnchoredOperation> =
            ops.iter().filter(|op| !op.is_published()).cloned().collect();

        let creates: Vec<&AnchoredOperation> = ops
            .iter()
            .filter(|op| op.operation_type == OperationType::Create)
            .collect();
        let updates: Vec<&AnchoredOperation> = ops
            .iter()
            .filter(|op| op.operation_type == OperationType::Update)
            .collect();
        let recoveries: Vec<&AnchoredOperation> = ops
            .iter()
            .filter(|op| {
                matches!(
                    op.operation_type,
                    OperationType::Recover | OperationType::Deactivate
                )
            })
            .collect();

        if creates.is_empty() {
            return Err(Error::CreateOperationNotFound);
        }
        let mut model = self.apply_first_valid_create(&creates)?;
        model.published_operations = published;
        model.unpublished_operations = unpublished;

        // Walk the recovery chain; between successive recovery operations
        // (and after the last one) consume the updates anchored in that
        // interval.
        let mut updates = updates.into_iter().peekable();
        for recovery in recoveries {
            let recovery_key = sort_key(recovery);
            while let Some(&update) = updates.peek() {
                if sort_key(update) < recovery_key {
                    self.try_apply(update, &mut model);
                    updates.next();
                } else {
                    break;
                }
            }
            self.try_apply(recovery, &mut model);
            if model.deactivated {
                return Ok(model);
            }
        }
        for update in updates {
            self.try_apply(update, &mut model);
        }
        Ok(model)
    }

    /// Creates are tried in anchoring order until one applies cleanly,
    /// which keeps a DID resolvable when garbage was anchored at its
    /// suffix.
    fn apply_first_valid_create(
        &self,
        creates: &[&AnchoredOperation],
    ) -> Result<ResolutionModel, Error> {
        let initial = ResolutionModel::default();
        for create in creates {
            match self.apply_operation(create, &initial) {
                Ok(model) => return Ok(model),
                Err(e) => {
                    debug!(
                        "discarding invalid create operation for {}: {}",
                        create.unique_suffix, e
                    );
                }
            }
        }
        Err(Error::ValidCreateOperationNotFound)
    }

    /// Apply one operation; on failure the operation is discarded and the
    /// model is left unchanged.
    fn try_apply(&self, op: &AnchoredOperation, model: &mut ResolutionModel) {
        match self.apply_operation(op, model) {
            Ok(applied) => *model = applied,
            Err(e) => {
                debug!(
                    "discarding {} operation for {}: {}",
                    op.operation_type, op.unique_suffix, e
                );
            }
        }
    }

    fn apply_operation(
        &self,
        op: &AnchoredOperation,
        model: &ResolutionModel,
    ) -> Result<ResolutionModel, Error> {
        let protocol = self.registry.get(op.transaction_time)?;
        OperationApplier::new(protocol).apply(op, model)
    }
}
