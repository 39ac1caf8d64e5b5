//! Fingerprinter selection by type signature
//!
//! Patterns are tried in order and the first match wins, so the order of
//! the tables below is the precedence order.

use super::{categorical, datetime, numeric, pair, stat, text, ratio, Fingerprint, Stat};
use crate::config::Config;
use crate::cost::CostPolicy;
use crate::reducer::{BoxReducer, Count, CountIf, Fuse, Reducer, ReducerExt};
use crate::timeseries::Resolution;
use crate::types::{Field, Signature, TypeSignature};
use crate::value::{Row, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Fingerprints one column
pub type ColumnFingerprinter = BoxReducer<Value, Fingerprint>;
/// Fingerprints a pair of columns read side by side
pub type PairFingerprinter = BoxReducer<(Value, Value), Fingerprint>;
/// Fingerprints every column of a dataset in one scan
pub type DatasetFingerprinter = BoxReducer<Row, BTreeMap<String, Fingerprint>>;

type BuildColumn = fn(&FingerprintBuilder, &TypeSignature) -> ColumnFingerprinter;
type BuildPair = fn(&FingerprintBuilder, &TypeSignature, &TypeSignature) -> PairFingerprinter;

struct ColumnRule {
    pattern: &'static str,
    matches: fn(&TypeSignature) -> bool,
    build: BuildColumn,
}

struct PairRule {
    pattern: &'static str,
    matches: fn(&TypeSignature, &TypeSignature) -> bool,
    build: BuildPair,
}

const COLUMN_RULES: &[ColumnRule] = &[
    ColumnRule {
        pattern: "DateTime",
        matches: TypeSignature::is_datetime,
        build: datetime::fingerprinter,
    },
    ColumnRule {
        pattern: "Numeric",
        matches: TypeSignature::is_numeric,
        build: numeric::fingerprinter,
    },
    ColumnRule {
        pattern: "Categorical",
        matches: TypeSignature::is_categorical,
        build: categorical::fingerprinter,
    },
    ColumnRule {
        pattern: "Text",
        matches: TypeSignature::is_text,
        build: text::fingerprinter,
    },
];

const PAIR_RULES: &[PairRule] = &[
    PairRule {
        pattern: "DateTime x Numeric",
        matches: |a, b| a.is_datetime() && b.is_numeric(),
        build: pair::timeseries_fingerprinter,
    },
    PairRule {
        pattern: "Numeric x Numeric",
        matches: |a, b| a.is_numeric() && b.is_numeric(),
        build: pair::numeric_fingerprinter,
    },
    PairRule {
        pattern: "Categorical x Any",
        matches: |a, _| a.is_categorical(),
        build: pair::rollup_fingerprinter,
    },
];

/// Name of the column pattern `sig` is fingerprinted with, `None` for the
/// default bundle
pub(crate) fn column_pattern(sig: &TypeSignature) -> Option<&'static str> {
    COLUMN_RULES
        .iter()
        .find(|rule| (rule.matches)(sig))
        .map(|rule| rule.pattern)
}

/// Name of the pair pattern `(a, b)` is fingerprinted with, `None` for the
/// default bundle
pub(crate) fn pair_pattern(a: &TypeSignature, b: &TypeSignature) -> Option<&'static str> {
    PAIR_RULES
        .iter()
        .find(|rule| (rule.matches)(a, b))
        .map(|rule| rule.pattern)
}

/// Builds fingerprinters for a fixed configuration and cost policy
///
/// Cloning is cheap: the configuration is shared.
#[derive(Clone, Debug)]
pub struct FingerprintBuilder {
    config: Arc<Config>,
    policy: CostPolicy,
    resolution: Resolution,
}

impl FingerprintBuilder {
    pub fn new(config: Config, policy: CostPolicy) -> Self {
        Self::shared(Arc::new(config), policy)
    }

    pub fn shared(config: Arc<Config>, policy: CostPolicy) -> Self {
        Self {
            config,
            policy,
            resolution: Resolution::default(),
        }
    }

    /// Grid used by DateTime x Numeric fingerprints
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policy(&self) -> &CostPolicy {
        &self.policy
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Fingerprinter for one column of signature `sig`
    pub fn column(&self, sig: &TypeSignature) -> ColumnFingerprinter {
        match COLUMN_RULES.iter().find(|rule| (rule.matches)(sig)) {
            Some(rule) => {
                debug!(signature = %sig, pattern = rule.pattern, "selected column fingerprinter");
                let specific = (rule.build)(self, sig);
                with_presence(specific, Value::is_missing, Stat::Type(Signature::Single(*sig)))
            }
            None => {
                debug!(signature = %sig, "no column pattern matched, using default");
                default_fingerprinter(Value::is_missing, Signature::Single(*sig))
            }
        }
    }

    /// Fingerprinter for the pair `(a, b)`, read as `(a value, b value)`
    pub fn pair(&self, a: &TypeSignature, b: &TypeSignature) -> PairFingerprinter {
        let signature = Signature::Pair(*a, *b);
        match PAIR_RULES.iter().find(|rule| (rule.matches)(a, b)) {
            Some(rule) => {
                debug!(left = %a, right = %b, pattern = rule.pattern, "selected pair fingerprinter");
                let specific = (rule.build)(self, a, b);
                with_presence(specific, pair_is_missing, Stat::Type(signature))
            }
            None => {
                debug!(left = %a, right = %b, "no pair pattern matched, using default");
                default_fingerprinter(pair_is_missing, signature)
            }
        }
    }

    /// One fingerprinter per column, fused so a dataset is scanned once
    ///
    /// The output is keyed by column name; if two columns share a name the
    /// later one wins.
    pub fn dataset(&self, columns: &[Field]) -> DatasetFingerprinter {
        columns
            .iter()
            .enumerate()
            .map(|(i, field)| {
                trace!(column = %field.name, index = i, "adding column fingerprinter");
                let column = self
                    .column(&field.signature())
                    .pre_step(move |row: &Row| row.get(i).cloned().unwrap_or(Value::Null))
                    .boxed();
                (field.name.clone(), column)
            })
            .collect::<Fuse<_>>()
            .boxed()
    }
}

fn pair_is_missing(pair: &(Value, Value)) -> bool {
    pair.0.is_missing() || pair.1.is_missing()
}

/// Adds the statistics every bundle carries: counts, nils and the matched
/// signature
fn with_presence<I, R>(specific: R, is_nil: fn(&I) -> bool, signature: Stat) -> BoxReducer<I, Fingerprint>
where
    I: 'static,
    R: Reducer<Input = I, Output = Fingerprint> + Send + Sync + 'static,
    R::State: Send + 'static,
{
    (Count::new(), CountIf::new(is_nil), specific)
        .post_complete(move |(count, nils, mut fp)| {
            fp.extend(presence(count, nils));
            fp.insert(stat::TYPE, signature.clone());
            fp
        })
        .boxed()
}

/// Bundle for signatures no pattern matches
fn default_fingerprinter<I: 'static>(is_nil: fn(&I) -> bool, actual: Signature) -> BoxReducer<I, Fingerprint> {
    (Count::new(), CountIf::new(is_nil))
        .post_complete(move |(count, nils)| {
            let mut fp = presence(count, nils);
            fp.insert(stat::TYPE, Stat::Absent);
            fp.insert(stat::ACTUAL_TYPE, actual);
            fp
        })
        .boxed()
}

fn presence(count: u64, nils: u64) -> Fingerprint {
    Fingerprint::new()
        .with(stat::COUNT, count)
        .with(stat::NIL_COUNT, nils)
        .with(stat::HAS_NILS, nils > 0)
        .with(stat::NIL_PCT, ratio(nils as f64, count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::transduce;
    use crate::types::{BaseType, SemanticType, TableId};

    fn sig(base: BaseType, semantic: Option<SemanticType>) -> TypeSignature {
        TypeSignature::new(base, semantic)
    }

    #[test]
    fn test_column_precedence() {
        let cases = [
            (sig(BaseType::Integer, None), Some("Numeric")),
            (sig(BaseType::Float, Some(SemanticType::Score)), Some("Numeric")),
            (sig(BaseType::DateTime, None), Some("DateTime")),
            (
                sig(BaseType::Integer, Some(SemanticType::UnixTimestampSeconds)),
                Some("DateTime"),
            ),
            (sig(BaseType::Integer, Some(SemanticType::Category)), Some("Numeric")),
            (sig(BaseType::Text, Some(SemanticType::Category)), Some("Categorical")),
            (sig(BaseType::Text, Some(SemanticType::City)), Some("Categorical")),
            (sig(BaseType::Boolean, None), Some("Categorical")),
            (sig(BaseType::Text, Some(SemanticType::Email)), Some("Text")),
            (sig(BaseType::Text, None), Some("Text")),
            (sig(BaseType::Time, None), None),
            (sig(BaseType::Unknown, None), None),
        ];

        for (signature, expected) in cases {
            assert_eq!(column_pattern(&signature), expected, "{}", signature);
        }
    }

    #[test]
    fn test_pair_precedence() {
        let date = sig(BaseType::Date, None);
        let int = sig(BaseType::Integer, None);
        let city = sig(BaseType::Text, Some(SemanticType::City));
        let text = sig(BaseType::Text, None);

        assert_eq!(pair_pattern(&date, &int), Some("DateTime x Numeric"));
        assert_eq!(pair_pattern(&int, &int), Some("Numeric x Numeric"));
        assert_eq!(pair_pattern(&city, &int), Some("Categorical x Any"));
        assert_eq!(pair_pattern(&city, &date), Some("Categorical x Any"));
        assert_eq!(pair_pattern(&int, &date), None);
        assert_eq!(pair_pattern(&text, &int), None);
    }

    #[test]
    fn test_default_bundle() {
        let builder = FingerprintBuilder::new(Config::default(), CostPolicy::linear());
        let time = sig(BaseType::Time, None);
        let fp = transduce(
            &builder.column(&time),
            [Value::from("10:00"), Value::Null, Value::Null],
        );

        assert_eq!(fp.count(stat::COUNT), Some(3));
        assert_eq!(fp.count(stat::NIL_COUNT), Some(2));
        assert_eq!(fp.flag(stat::HAS_NILS), Some(true));
        assert_eq!(fp.get(stat::TYPE), Some(&Stat::Absent));
        assert_eq!(fp.signature(stat::ACTUAL_TYPE), Some(Signature::Single(time)));
        assert_eq!(fp.len(), 6);
    }

    #[test]
    fn test_matched_bundle_carries_type() {
        let builder = FingerprintBuilder::new(Config::default(), CostPolicy::linear());
        let text = sig(BaseType::Text, None);
        let fp = transduce(&builder.column(&text), Vec::<Value>::new());

        assert_eq!(fp.count(stat::COUNT), Some(0));
        assert_eq!(fp.flag(stat::HAS_NILS), Some(false));
        assert!(fp.is_absent(stat::NIL_PCT));
        assert_eq!(fp.signature(stat::TYPE), Some(Signature::Single(text)));
        assert!(!fp.contains(stat::ACTUAL_TYPE));
    }

    #[test]
    fn test_dataset_scans_rows_once() {
        let builder = FingerprintBuilder::new(Config::default(), CostPolicy::linear());
        let table = TableId(1);
        let columns = vec![
            Field::new(1, "n", BaseType::Integer, table),
            Field::new(2, "label", BaseType::Text, table)
                .with_semantic_type(SemanticType::Category),
        ];
        let rows: Vec<Row> = vec![
            vec![Value::from(1i64), Value::from("a")],
            vec![Value::from(3i64), Value::from("b")],
            // short row: the missing cell reads as null
            vec![Value::Null],
        ];

        let out = transduce(&builder.dataset(&columns), &rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out["n"].number(stat::MEAN), Some(2.0));
        assert_eq!(out["n"].count(stat::NIL_COUNT), Some(1));
        assert_eq!(out["label"].count(stat::COUNT), Some(3));
        assert_eq!(out["label"].count(stat::NIL_COUNT), Some(1));
    }
}
