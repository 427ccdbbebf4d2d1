//! Proptest generators for property-based testing.

use proptest::prelude::*;

use cipherscore_core::{Identity, RecordFields, RecordId};

/// Generate a valid record id.
pub fn record_id() -> impl Strategy<Value = RecordId> {
    "[a-z][a-z0-9-]{0,31}".prop_map(|s| RecordId::new(s).expect("pattern is non-empty"))
}

/// Generate an identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    any::<[u8; 32]>().prop_map(Identity::from_bytes)
}

/// Generate a score. Biased toward the encoding edges.
pub fn score() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        Just(u64::MAX),
        0u64..=1000,
        any::<u64>(),
    ]
}

/// Generate valid plaintext record fields.
pub fn record_fields() -> impl Strategy<Value = RecordFields> {
    (
        "[A-Za-z][A-Za-z ]{0,31}",
        any::<u64>(),
        any::<u64>(),
        "[ -~]{0,64}",
    )
        .prop_map(|(label, f1, f2, notes)| RecordFields::new(label).factors(f1, f2).notes(notes))
}

/// One registration in a generated workload.
#[derive(Debug, Clone)]
pub struct RegistrationParams {
    pub id: RecordId,
    pub owner: Identity,
    pub score: u64,
    pub fields: RecordFields,
}

impl Arbitrary for RegistrationParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (record_id(), identity(), score(), record_fields())
            .prop_map(|(id, owner, score, fields)| RegistrationParams {
                id,
                owner,
                score,
                fields,
            })
            .boxed()
    }
}

/// A sequence of registrations. Ids come from a small pool so duplicates
/// occur.
pub fn workload(max_len: usize) -> impl Strategy<Value = Vec<RegistrationParams>> {
    prop::collection::vec(
        (0u8..8, identity(), score(), record_fields()).prop_map(|(slot, owner, score, fields)| {
            RegistrationParams {
                id: RecordId::new(format!("r{}", slot)).expect("non-empty id"),
                owner,
                score,
                fields,
            }
        }),
        1..=max_len,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherscore_core::{validate_fields, validate_id, FieldLimits};

    proptest! {
        #[test]
        fn test_registration_params_are_valid(params: RegistrationParams) {
            let limits = FieldLimits::default();
            prop_assert!(validate_id(params.id.as_str(), &limits).is_ok());
            prop_assert!(validate_fields(&params.fields, &limits).is_ok());
        }

        #[test]
        fn test_workload_ids_come_from_small_pool(batch in workload(16)) {
            prop_assert!(!batch.is_empty());
            for params in &batch {
                prop_assert!(params.id.as_str().len() == 2);
            }
        }
    }
}
