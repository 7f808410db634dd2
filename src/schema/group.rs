//! Schema groups

use property_value::Value;

use crate::ids::{FieldId, SchemaGroupId};

use super::condition::Condition;
use super::field::SchemaField;

/// A group of fields. `is_list` groups become GroupLists in instances.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaGroup {
    pub id: SchemaGroupId,
    pub title: Option<String>,
    pub fields: Vec<SchemaField>,
    pub is_list: bool,
    /// Field whose value labels a list item in editors
    pub representative_field: Option<FieldId>,
    pub available_if: Option<Condition>,
}

impl SchemaGroup {
    pub fn new(id: impl Into<SchemaGroupId>, fields: Vec<SchemaField>) -> Self {
        Self {
            id: id.into(),
            title: None,
            fields,
            is_list: false,
            representative_field: None,
            available_if: None,
        }
    }

    /// Same group, marked as a list
    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    pub fn with_representative(mut self, field: impl Into<FieldId>) -> Self {
        self.representative_field = Some(field.into());
        self
    }

    pub fn field(&self, id: &FieldId) -> Option<&SchemaField> {
        self.fields.iter().find(|f| &f.id == id)
    }

    pub fn has_field(&self, id: &FieldId) -> bool {
        self.field(id).is_some()
    }

    pub fn representative_field(&self) -> Option<&SchemaField> {
        self.representative_field.as_ref().and_then(|id| self.field(id))
    }

    /// Whether `field` is shown, given a lookup of sibling values.
    ///
    /// Fields without a condition are always available; unknown fields never
    /// are.
    pub fn is_field_available<'a>(
        &self,
        field: &FieldId,
        sibling: impl Fn(&FieldId) -> Option<&'a Value>,
    ) -> bool {
        match self.field(field) {
            Some(f) => match &f.available_if {
                Some(cond) => cond.is_satisfied(sibling(&cond.field)),
                None => true,
            },
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use property_value::ValueType;

    fn marker_group() -> SchemaGroup {
        SchemaGroup::new(
            "default",
            vec![
                SchemaField::new("style", ValueType::String).with_choices(&["point", "image"]),
                SchemaField::new("image", ValueType::Url)
                    .with_condition(Condition::new("style", Value::String("image".into()))),
            ],
        )
        .with_representative("style")
    }

    #[test]
    fn test_field_lookup() {
        let group = marker_group();
        assert!(group.has_field(&"image".into()));
        assert!(!group.has_field(&"label".into()));
        assert_eq!(group.representative_field().map(|f| f.id.as_str()), Some("style"));
    }

    #[test]
    fn test_field_availability() {
        let group = marker_group();
        let image = Value::String("image".into());
        let point = Value::String("point".into());

        assert!(group.is_field_available(&"style".into(), |_| None));
        assert!(group.is_field_available(&"image".into(), |_| Some(&image)));
        assert!(!group.is_field_available(&"image".into(), |_| Some(&point)));
        assert!(!group.is_field_available(&"image".into(), |_| None));
        assert!(!group.is_field_available(&"missing".into(), |_| None));
    }
}
