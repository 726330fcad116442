//! Datasets
//!
//! A dataset is a view over stores and other datasets. It holds either one
//! definition, or an ordered list of child resolvables when built from
//! several arguments. Datasets created through a store or dataset carry a
//! non-owning `parent` link; the resolution engine follows that chain to
//! inherit URIs and actions.

use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::definition::DatasetDefinition;
use crate::error::{ResourceError, Result};
use crate::resolvable::{ParentRef, Resolvable, ResolvableDescriptor, ResolvableKind, ResolvableRef, ResolvedDefinition};
use crate::store::Store;

/// One argument to [`create_dataset`]
///
/// Either raw configuration (typed or JSON) or a prebuilt resolvable.
#[derive(Debug, Clone)]
pub enum DatasetArg {
    Definition(DatasetDefinition),
    Raw(Value),
    Resolvable(ResolvableRef),
}

impl From<DatasetDefinition> for DatasetArg {
    fn from(definition: DatasetDefinition) -> Self {
        DatasetArg::Definition(definition)
    }
}

impl From<Value> for DatasetArg {
    fn from(value: Value) -> Self {
        DatasetArg::Raw(value)
    }
}

impl From<ResolvableRef> for DatasetArg {
    fn from(resolvable: ResolvableRef) -> Self {
        DatasetArg::Resolvable(resolvable)
    }
}

impl From<Store> for DatasetArg {
    fn from(store: Store) -> Self {
        DatasetArg::Resolvable(ResolvableRef::Store(store))
    }
}

impl From<Dataset> for DatasetArg {
    fn from(dataset: Dataset) -> Self {
        DatasetArg::Resolvable(ResolvableRef::Dataset(dataset))
    }
}

#[derive(Debug)]
enum DatasetBody {
    Single(DatasetDefinition),
    Composite(Vec<ResolvableRef>),
}

pub(crate) struct DatasetInner {
    body: DatasetBody,
    parent: Option<ParentRef>,
}

/// Handle to a dataset
#[derive(Clone)]
pub struct Dataset {
    inner: Arc<DatasetInner>,
}

/// Non-owning dataset handle
#[derive(Debug, Clone)]
pub struct WeakDataset(Weak<DatasetInner>);

impl WeakDataset {
    pub fn upgrade(&self) -> Option<Dataset> {
        self.0.upgrade().map(|inner| Dataset { inner })
    }
}

impl Dataset {
    fn new(body: DatasetBody, parent: Option<ParentRef>) -> Self {
        Self {
            inner: Arc::new(DatasetInner { body, parent }),
        }
    }

    /// Create a dataset whose parent is this dataset
    pub fn create_dataset<I>(&self, args: I) -> Result<Dataset>
    where
        I: IntoIterator<Item = DatasetArg>,
    {
        create_dataset_with_parent(args, Some(ParentRef::Dataset(self.downgrade())))
    }

    /// Single definition, `None` for composites
    pub fn single_definition(&self) -> Option<&DatasetDefinition> {
        match &self.inner.body {
            DatasetBody::Single(definition) => Some(definition),
            DatasetBody::Composite(_) => None,
        }
    }

    /// Ordered children; empty for single-definition datasets
    pub fn children(&self) -> &[ResolvableRef] {
        match &self.inner.body {
            DatasetBody::Single(_) => &[],
            DatasetBody::Composite(children) => children,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.inner.body, DatasetBody::Composite(_))
    }

    pub fn partial(&self) -> Option<&str> {
        self.single_definition().and_then(|d| d.partial.as_deref())
    }

    pub fn parent_ref(&self) -> Option<&ParentRef> {
        self.inner.parent.as_ref()
    }

    /// The store or dataset this dataset was created from, if still alive
    pub fn parent(&self) -> Option<ResolvableRef> {
        self.inner.parent.as_ref().and_then(ParentRef::upgrade)
    }

    /// Parent chain, nearest first
    ///
    /// Stops at a store (stores have no parent) or at the first parent that
    /// has been dropped.
    pub fn ancestors(&self) -> Vec<ResolvableRef> {
        let mut chain = Vec::new();
        let mut next = self.parent();

        while let Some(current) = next {
            next = current.as_dataset().and_then(Dataset::parent);
            chain.push(current);
        }

        chain
    }

    pub fn ptr_eq(&self, other: &Dataset) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakDataset {
        WeakDataset(Arc::downgrade(&self.inner))
    }
}

impl Resolvable for Dataset {
    fn resolvable(&self) -> ResolvableDescriptor {
        let definition = match &self.inner.body {
            DatasetBody::Single(definition) => ResolvedDefinition::Dataset(definition.clone()),
            DatasetBody::Composite(children) => ResolvedDefinition::Composite(children.clone()),
        };

        ResolvableDescriptor {
            kind: ResolvableKind::Dataset,
            definition,
            reference: ResolvableRef::Dataset(self.clone()),
        }
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("body", &self.inner.body)
            .field("parent", &self.inner.parent.as_ref().map(ParentRef::kind))
            .finish()
    }
}

/// Build a dataset from one or more definitions or resolvables
///
/// One definition gives a single dataset. Otherwise every argument becomes
/// a child, in order: resolvables are kept as-is, definitions are wrapped
/// in their own dataset.
pub fn create_dataset<I>(args: I) -> Result<Dataset>
where
    I: IntoIterator<Item = DatasetArg>,
{
    create_dataset_with_parent(args, None)
}

pub(crate) fn create_dataset_with_parent<I>(args: I, parent: Option<ParentRef>) -> Result<Dataset>
where
    I: IntoIterator<Item = DatasetArg>,
{
    let mut args: Vec<DatasetArg> = args.into_iter().collect();

    let body = match args.len() {
        0 => return Err(ResourceError::EmptyDataset),
        1 => match args.remove(0) {
            DatasetArg::Definition(definition) => DatasetBody::Single(definition),
            DatasetArg::Raw(value) => DatasetBody::Single(DatasetDefinition::from_value(&value)?),
            DatasetArg::Resolvable(resolvable) => DatasetBody::Composite(vec![resolvable]),
        },
        _ => {
            let children = args
                .into_iter()
                .map(|arg| match arg {
                    DatasetArg::Resolvable(resolvable) => Ok(resolvable),
                    definition => create_dataset([definition]).map(ResolvableRef::Dataset),
                })
                .collect::<Result<Vec<_>>>()?;
            DatasetBody::Composite(children)
        }
    };

    Ok(Dataset::new(body, parent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_raw_definition() {
        let dataset = create_dataset([json!({ "partial": "card", "uri": "/cards" }).into()]).unwrap();

        assert!(!dataset.is_composite());
        assert_eq!(dataset.partial(), Some("card"));
        assert!(dataset.parent().is_none());
    }

    #[test]
    fn test_invalid_definition_rejected() {
        let err = create_dataset([json!({ "type": "widgets" }).into()]).unwrap_err();
        assert!(matches!(err, ResourceError::UnknownDefinitionKey { .. }));

        let err = create_dataset([json!({ "partial": "a" }).into(), json!(["b"]).into()]).unwrap_err();
        assert!(matches!(err, ResourceError::InvalidDefinitionType { .. }));
    }

    #[test]
    fn test_empty_arguments_rejected() {
        assert!(matches!(
            create_dataset(Vec::new()),
            Err(ResourceError::EmptyDataset)
        ));
    }

    #[test]
    fn test_composite_wraps_definitions_in_order() {
        let dataset = create_dataset([
            DatasetDefinition::new().with_partial("a").into(),
            json!({ "partial": "b" }).into(),
        ])
        .unwrap();

        let partials: Vec<_> = dataset
            .children()
            .iter()
            .map(|child| child.as_dataset().and_then(Dataset::partial).map(str::to_string))
            .collect();
        assert_eq!(partials, vec![Some("a".to_string()), Some("b".to_string())]);

        for child in dataset.children() {
            assert_eq!(child.resolvable().kind, ResolvableKind::Dataset);
        }
    }

    #[test]
    fn test_composite_keeps_resolvables() {
        let inner = create_dataset([DatasetDefinition::new().with_partial("inner").into()]).unwrap();
        let dataset = create_dataset([
            inner.clone().into(),
            DatasetDefinition::new().with_partial("raw").into(),
        ])
        .unwrap();

        assert!(dataset.children()[0].ptr_eq(&ResolvableRef::Dataset(inner)));
        assert!(dataset.children()[1].as_dataset().is_some());
    }

    #[test]
    fn test_single_resolvable_is_wrapped() {
        let inner = create_dataset([DatasetDefinition::new().into()]).unwrap();
        let dataset = create_dataset([inner.clone().into()]).unwrap();

        assert!(dataset.is_composite());
        assert_eq!(dataset.children().len(), 1);
        assert!(dataset.children()[0].ptr_eq(&inner.into()));
    }

    #[test]
    fn test_parent_chain() {
        let root = create_dataset([DatasetDefinition::new().with_uri("/root").into()]).unwrap();
        let child = root.create_dataset([DatasetDefinition::new().into()]).unwrap();
        let grandchild = child.create_dataset([DatasetDefinition::new().into()]).unwrap();

        let chain = grandchild.ancestors();
        assert_eq!(chain.len(), 2);
        assert!(chain[0].ptr_eq(&child.clone().into()));
        assert!(chain[1].ptr_eq(&root.clone().into()));
    }

    #[test]
    fn test_parent_is_not_owned() {
        let child = {
            let root = create_dataset([DatasetDefinition::new().into()]).unwrap();
            root.create_dataset([DatasetDefinition::new().into()]).unwrap()
        };

        assert_eq!(child.parent_ref().map(ParentRef::kind), Some(ResolvableKind::Dataset));
        assert!(child.parent().is_none());
        assert!(child.ancestors().is_empty());
    }

    #[test]
    fn test_composite_children_have_no_parent() {
        let root = create_dataset([DatasetDefinition::new().into()]).unwrap();
        let composite = root
            .create_dataset([DatasetDefinition::new().into(), DatasetDefinition::new().into()])
            .unwrap();

        assert!(composite.parent().is_some());
        for child in composite.children() {
            assert!(child.as_dataset().and_then(Dataset::parent).is_none());
        }
    }
}
