//! Content [`Schema`] definitions.

use serde::Deserialize;
use smart_default::SmartDefault;

use super::document::TypeName;

/// Content types the reference cascade operates on.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Schema {
    /// [`TypeName`] of the city content type, the root of the hierarchy.
    #[default(TypeName::new("city").expect("valid literal"))]
    pub city: TypeName,

    /// [`TypeName`] of the community content type.
    #[default(TypeName::new("community").expect("valid literal"))]
    pub community: TypeName,

    /// [`TypeName`]s of the property listing content types whose references
    /// are discovered, in this exact order.
    #[default(vec![
        TypeName::new("floorPlans").expect("valid literal"),
        TypeName::new("preConstruction").expect("valid literal"),
        TypeName::new("quickPossession").expect("valid literal"),
        TypeName::new("showHome").expect("valid literal"),
    ])]
    pub related: Vec<TypeName>,
}

impl Schema {
    /// Indicates whether [`Document`]s of the provided [`TypeName`] may be
    /// targeted by the reference cascade.
    ///
    /// [`Document`]: super::Document
    #[must_use]
    pub fn accepts(&self, type_name: &TypeName) -> bool {
        *type_name == self.city || *type_name == self.community
    }
}
