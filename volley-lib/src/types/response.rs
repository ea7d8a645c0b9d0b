use serde::Serialize;
use serde_json::Value;

/// The result of one [`RequestDescriptor`](crate::RequestDescriptor)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseResult {
    /// The decoded body of a single response
    Single(Value),
    /// Decoded bodies of consecutive pages, in the order they were fetched
    Pages(Vec<Value>),
}

impl ResponseResult {
    /// Returns `true` if this result was assembled from several pages
    #[must_use]
    pub const fn is_paginated(&self) -> bool {
        matches!(self, Self::Pages(_))
    }

    /// Number of decoded response bodies in this result
    #[must_use]
    pub fn page_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Pages(pages) => pages.len(),
        }
    }

    /// All decoded bodies of this result
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Self::Single(value) => vec![value],
            Self::Pages(pages) => pages,
        }
    }
}

impl From<Value> for ResponseResult {
    fn from(value: Value) -> Self {
        Self::Single(value)
    }
}

/// All results of one batch.
///
/// Results are stored in the order their requests *completed*, which is
/// unrelated to the order they were submitted in. Callers needing positional
/// correspondence have to carry an identifier through their requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResponseCollection(Vec<ResponseResult>);

impl ResponseCollection {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub(crate) fn push(&mut self, result: ResponseResult) {
        self.0.push(result);
    }

    /// Number of results
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no results
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the results
    pub fn iter(&self) -> std::slice::Iter<'_, ResponseResult> {
        self.0.iter()
    }

    /// Consume the collection, returning the results
    #[must_use]
    pub fn into_inner(self) -> Vec<ResponseResult> {
        self.0
    }

    /// Every decoded body of the batch, with paginated results expanded
    /// in place
    #[must_use]
    pub fn flatten(self) -> Vec<Value> {
        self.0
            .into_iter()
            .flat_map(ResponseResult::into_values)
            .collect()
    }
}

impl IntoIterator for ResponseCollection {
    type Item = ResponseResult;
    type IntoIter = std::vec::IntoIter<ResponseResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResponseCollection {
    type Item = &'a ResponseResult;
    type IntoIter = std::slice::Iter<'a, ResponseResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<ResponseResult> for ResponseCollection {
    fn from_iter<T: IntoIterator<Item = ResponseResult>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<ResponseCollection> for Vec<ResponseResult> {
    fn from(collection: ResponseCollection) -> Self {
        collection.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_flatten_expands_pages() {
        let collection: ResponseCollection = vec![
            ResponseResult::Single(json!({"id": 1})),
            ResponseResult::Pages(vec![json!({"id": 2}), json!({"id": 3})]),
        ]
        .into_iter()
        .collect();

        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.flatten(),
            vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]
        );
    }

    #[test]
    fn test_serialize_untagged() {
        let collection: ResponseCollection = vec![
            ResponseResult::Single(json!({"id": 1})),
            ResponseResult::Pages(vec![json!({"id": 2})]),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            serde_json::to_value(&collection).unwrap(),
            json!([{"id": 1}, [{"id": 2}]])
        );
    }

    #[test]
    fn test_page_count() {
        assert_eq!(ResponseResult::from(json!(null)).page_count(), 1);
        assert_eq!(ResponseResult::Pages(vec![]).page_count(), 0);
        assert!(ResponseResult::Pages(vec![]).is_paginated());
    }
}
