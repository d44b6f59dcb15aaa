use crate::constants::fields;

/// Normalization rule category applied to one field's raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Keep the raw string as-is.
    Passthrough,
    /// Uppercase, strip diacritics and stray newlines; optionally drop
    /// dots/commas and collapse whitespace runs into underscores.
    TextNormalize {
        replace_spaces: bool,
        replace_dots: bool,
    },
    /// Comma-decimal tolerant float; unparsable values become empty cells.
    Decimal,
    /// Reformat `dd/mm/yyyy` into `yyyy-mm-dd`.
    Date,
    /// Split a `mon-yy` token into a month number plus a sibling year field.
    MonthYearToken,
}

/// One entry of the declarative field schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

/// The projection export schema, in source column order. Defined once at
/// build time; misconfiguration here is a code bug, not a runtime case.
pub const PROJECTION_SCHEMA: &[FieldRule] = &[
    FieldRule {
        name: fields::SEASON,
        required: true,
        kind: FieldKind::Passthrough,
    },
    FieldRule {
        name: fields::FRUIT,
        required: true,
        kind: FieldKind::TextNormalize {
            replace_spaces: false,
            replace_dots: true,
        },
    },
    FieldRule {
        name: fields::COLLECTION_CENTER,
        required: true,
        kind: FieldKind::TextNormalize {
            replace_spaces: false,
            replace_dots: true,
        },
    },
    FieldRule {
        name: fields::STATE,
        required: true,
        kind: FieldKind::TextNormalize {
            replace_spaces: false,
            replace_dots: true,
        },
    },
    FieldRule {
        name: fields::PRODUCER_CODE,
        required: true,
        kind: FieldKind::TextNormalize {
            replace_spaces: false,
            replace_dots: true,
        },
    },
    FieldRule {
        name: fields::PRODUCER_NAME,
        required: true,
        kind: FieldKind::TextNormalize {
            replace_spaces: true,
            replace_dots: true,
        },
    },
    FieldRule {
        name: fields::ORCHARD_NAME,
        required: true,
        kind: FieldKind::TextNormalize {
            replace_spaces: true,
            replace_dots: true,
        },
    },
    FieldRule {
        name: fields::ORCHARD_CODE,
        required: true,
        kind: FieldKind::Decimal,
    },
    FieldRule {
        name: fields::HECTARES,
        required: true,
        kind: FieldKind::Decimal,
    },
    FieldRule {
        name: fields::MONTH,
        required: true,
        kind: FieldKind::MonthYearToken,
    },
    FieldRule {
        name: fields::WEEK,
        required: true,
        kind: FieldKind::Passthrough,
    },
    FieldRule {
        name: fields::PROJECTED_BOXES,
        required: true,
        kind: FieldKind::Decimal,
    },
    FieldRule {
        name: fields::VARIETY,
        required: true,
        kind: FieldKind::TextNormalize {
            replace_spaces: false,
            replace_dots: true,
        },
    },
    FieldRule {
        name: fields::UPDATE_DATE,
        required: true,
        kind: FieldKind::Date,
    },
];

/// Ordered field rules for the projection export.
pub fn projection_schema() -> &'static [FieldRule] {
    PROJECTION_SCHEMA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_preserves_source_column_order() {
        let names: Vec<&str> = PROJECTION_SCHEMA.iter().map(|r| r.name).collect();
        assert_eq!(names.first(), Some(&fields::SEASON));
        assert_eq!(names.last(), Some(&fields::UPDATE_DATE));
        assert_eq!(names.len(), 14);
    }

    #[test]
    fn month_rule_feeds_the_year_side_channel() {
        let month_rule = PROJECTION_SCHEMA
            .iter()
            .find(|r| r.name == fields::MONTH)
            .unwrap();
        assert_eq!(month_rule.kind, FieldKind::MonthYearToken);
        // The year column is injected, never read from the source
        assert!(!PROJECTION_SCHEMA.iter().any(|r| r.name == fields::YEAR));
    }
}
