//! Field descriptors and type signatures
//!
//! Fields, tables, saved queries and segments are owned by the caller; the
//! engine only reads their identity and declared types. A field's declared
//! types collapse into a [`TypeSignature`], which is what the fingerprint
//! dispatch table matches on.

use core::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identity of a field
    FieldId,
    "field"
);
id_type!(
    /// Identity of a table
    TableId,
    "table"
);
id_type!(
    /// Identity of a saved query
    QueryId,
    "query"
);
id_type!(
    /// Identity of a segment
    SegmentId,
    "segment"
);

/// Storage type of a field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BaseType {
    Integer,
    BigInteger,
    Float,
    Decimal,
    Boolean,
    Text,
    Date,
    DateTime,
    Time,
    Unknown,
}

/// What the values of a field mean, independent of storage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SemanticType {
    Category,
    Enum,
    City,
    State,
    Country,
    ZipCode,
    Company,
    Name,
    Email,
    Url,
    PrimaryKey,
    ForeignKey,
    Latitude,
    Longitude,
    Quantity,
    Currency,
    Score,
    UnixTimestampSeconds,
    UnixTimestampMilliseconds,
    CreationTimestamp,
}

impl SemanticType {
    pub fn is_categorical(self) -> bool {
        matches!(
            self,
            SemanticType::Category
                | SemanticType::Enum
                | SemanticType::City
                | SemanticType::State
                | SemanticType::Country
                | SemanticType::ZipCode
                | SemanticType::Company
                | SemanticType::ForeignKey
        )
    }

    pub fn is_unix_timestamp(self) -> bool {
        matches!(
            self,
            SemanticType::UnixTimestampSeconds | SemanticType::UnixTimestampMilliseconds
        )
    }
}

/// `(base type, semantic type)` of one field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeSignature {
    pub base: BaseType,
    pub semantic: Option<SemanticType>,
}

impl TypeSignature {
    pub fn new(base: BaseType, semantic: Option<SemanticType>) -> Self {
        Self { base, semantic }
    }

    pub fn of(base: BaseType) -> Self {
        Self::new(base, None)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.base,
            BaseType::Integer | BaseType::BigInteger | BaseType::Float | BaseType::Decimal
        )
    }

    pub fn is_datetime(&self) -> bool {
        matches!(self.base, BaseType::Date | BaseType::DateTime)
            || self.semantic.is_some_and(SemanticType::is_unix_timestamp)
    }

    pub fn is_categorical(&self) -> bool {
        self.base == BaseType::Boolean || self.semantic.is_some_and(SemanticType::is_categorical)
    }

    pub fn is_text(&self) -> bool {
        self.base == BaseType::Text
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.semantic {
            Some(semantic) => write!(f, "{:?}/{:?}", self.base, semantic),
            None => write!(f, "{:?}", self.base),
        }
    }
}

/// Signature of a single column or of a column pair
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Signature {
    Single(TypeSignature),
    Pair(TypeSignature, TypeSignature),
}

impl From<TypeSignature> for Signature {
    fn from(sig: TypeSignature) -> Self {
        Signature::Single(sig)
    }
}

/// A column of a table, saved query or segment
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub base_type: BaseType,
    pub semantic_type: Option<SemanticType>,
    pub table: TableId,
}

impl Field {
    pub fn new(id: u64, name: impl Into<String>, base_type: BaseType, table: TableId) -> Self {
        Self {
            id: FieldId(id),
            name: name.into(),
            base_type,
            semantic_type: None,
            table,
        }
    }

    pub fn with_semantic_type(mut self, semantic: SemanticType) -> Self {
        self.semantic_type = Some(semantic);
        self
    }

    pub fn signature(&self) -> TypeSignature {
        TypeSignature::new(self.base_type, self.semantic_type)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    pub id: TableId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SavedQuery {
    pub id: QueryId,
    pub name: String,
}

/// A filtered view of one table
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    pub id: SegmentId,
    pub name: String,
    pub table: TableId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns() {
        let int = TypeSignature::of(BaseType::Integer);
        assert!(int.is_numeric());
        assert!(!int.is_datetime());
        assert!(!int.is_categorical());

        let category = TypeSignature::new(BaseType::Integer, Some(SemanticType::Category));
        assert!(category.is_numeric());
        assert!(category.is_categorical());

        let ts = TypeSignature::new(BaseType::BigInteger, Some(SemanticType::UnixTimestampSeconds));
        assert!(ts.is_numeric());
        assert!(ts.is_datetime());

        let flag = TypeSignature::of(BaseType::Boolean);
        assert!(flag.is_categorical());
        assert!(!flag.is_numeric());

        let city = TypeSignature::new(BaseType::Text, Some(SemanticType::City));
        assert!(city.is_text());
        assert!(city.is_categorical());

        assert!(!TypeSignature::of(BaseType::Time).is_datetime());
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldId(3).to_string(), "field#3");
        assert_eq!(TableId(9).to_string(), "table#9");
        assert_eq!(
            TypeSignature::new(BaseType::Text, Some(SemanticType::Email)).to_string(),
            "Text/Email"
        );
        assert_eq!(TypeSignature::of(BaseType::Float).to_string(), "Float");
    }

    #[test]
    fn test_field_signature() {
        let field = Field::new(1, "country", BaseType::Text, TableId(1))
            .with_semantic_type(SemanticType::Country);
        assert_eq!(
            field.signature(),
            TypeSignature::new(BaseType::Text, Some(SemanticType::Country))
        );
    }
}
