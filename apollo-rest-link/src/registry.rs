//! Named functions that `@rest` directives can refer to.
//!
//! Directives only carry names, e.g. `@rest(pathBuilder: $postPath)` or
//! `@rest(fieldNameNormalizer: "camelize")`. Those names resolve against a
//! [`Registry`] when the document is turned into an [`crate::Operation`].

use std::collections::HashMap;

use crate::field_names::FieldNameTransform;
use crate::headers::HeaderMergePolicy;
use crate::path_template::PathBuilder;
use crate::spec::BodyBuilder;

#[derive(Clone, Debug, Default)]
pub struct Registry {
    path_builders: HashMap<String, PathBuilder>,
    body_builders: HashMap<String, BodyBuilder>,
    field_name_transforms: HashMap<String, FieldNameTransform>,
    header_merge_policies: HashMap<String, HeaderMergePolicy>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_builder(mut self, name: impl Into<String>, builder: PathBuilder) -> Self {
        self.path_builders.insert(name.into(), builder);
        self
    }

    pub fn with_body_builder(mut self, name: impl Into<String>, builder: BodyBuilder) -> Self {
        self.body_builders.insert(name.into(), builder);
        self
    }

    pub fn with_field_name_transform(
        mut self,
        name: impl Into<String>,
        transform: FieldNameTransform,
    ) -> Self {
        self.field_name_transforms.insert(name.into(), transform);
        self
    }

    pub fn with_header_merge_policy(
        mut self,
        name: impl Into<String>,
        policy: HeaderMergePolicy,
    ) -> Self {
        self.header_merge_policies.insert(name.into(), policy);
        self
    }

    pub(crate) fn path_builder(&self, name: &str) -> Option<&PathBuilder> {
        self.path_builders.get(name)
    }

    pub(crate) fn body_builder(&self, name: &str) -> Option<&BodyBuilder> {
        self.body_builders.get(name)
    }

    pub(crate) fn field_name_transform(&self, name: &str) -> Option<&FieldNameTransform> {
        self.field_name_transforms.get(name)
    }

    pub(crate) fn header_merge_policy(&self, name: &str) -> Option<&HeaderMergePolicy> {
        self.header_merge_policies.get(name)
    }
}
