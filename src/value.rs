//! The heterogeneous value graph a watch walks over.
//!
//! A [`Value`] is either a primitive leaf, a plain container ([`List`] or
//! [`Object`]) or a reactive cell ([`Observable`] or [`ObservableArray`]).
//! Containers and cells are shared handles: cloning a `Value` clones the
//! handle, never the contents, so the same container can be reached from
//! several parents and containers can (directly or indirectly) hold themselves.

use crate::cell::{CellId, Observable, ObservableArray};
use crate::error::CellError;
use crate::hash::PropertyMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Position of a value inside its parent: a sequence slot or a property name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Slot of a [`List`] or [`ObservableArray`].
    Index(usize),
    /// Property of an [`Object`].
    Name(Arc<str>),
}

impl Key {
    /// The slot index, if this key addresses a sequence.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Name(_) => None,
        }
    }

    /// The property name, if this key addresses an object.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Index(_) => None,
            Key::Name(name) => Some(name),
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.into())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name.into())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

/// Identity of a plain container: the address of its shared allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ContainerId(usize);

impl ContainerId {
    fn of<T>(shared: &Arc<T>) -> Self {
        ContainerId(Arc::as_ptr(shared) as *const () as usize)
    }
}

/// A plain, non-reactive ordered sequence.
///
/// Mutating a `List` does not notify anyone. Put reactive cells inside it to
/// make its slots observable.
#[derive(Clone, Default)]
pub struct List {
    items: Arc<RwLock<Vec<Value>>>,
}

impl List {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if the list has no slots
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Value at `index`, if present
    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.read().get(index).cloned()
    }

    /// Append a value
    pub fn push(&self, value: impl Into<Value>) {
        self.items.write().push(value.into());
    }

    /// Overwrite slot `index`, returning the previous value.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<Value, CellError> {
        let mut items = self.items.write();
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(CellError::IndexOutOfBounds { index, len })?;
        Ok(std::mem::replace(slot, value.into()))
    }

    /// Snapshot of the current slots
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.read().clone()
    }

    /// Returns true if both handles point at the same list
    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    pub(crate) fn id(&self) -> ContainerId {
        ContainerId::of(&self.items)
    }
}

impl<V: Into<Value>> FromIterator<V> for List {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            items: Arc::new(RwLock::new(iter.into_iter().map(Into::into).collect())),
        }
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Contents are not printed: a list may contain itself.
        f.debug_struct("List")
            .field("id", &self.id())
            .field("len", &self.len())
            .finish()
    }
}

type Properties = PropertyMap<Arc<str>, Value>;

/// A plain, non-reactive string-keyed container.
///
/// Properties are enumerated in insertion order.
#[derive(Clone, Default)]
pub struct Object {
    props: Arc<RwLock<Properties>>,
}

impl Object {
    /// Create an empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy when assembling a graph inline.
    ///
    /// ```ignore
    /// let root = Object::new().with("bar", Observable::new(1));
    /// ```
    pub fn with(self, key: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a property, returning the previous value if there was one
    pub fn insert(&self, key: impl Into<Arc<str>>, value: impl Into<Value>) -> Option<Value> {
        self.props.write().insert(key.into(), value.into())
    }

    /// Read a property
    pub fn get(&self, key: &str) -> Option<Value> {
        self.props.read().get(key).cloned()
    }

    /// Remove a property, keeping the order of the remaining ones
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.props.write().shift_remove(key)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.props.read().len()
    }

    /// Returns true if the object has no properties
    pub fn is_empty(&self) -> bool {
        self.props.read().is_empty()
    }

    /// Property names in insertion order
    pub fn keys(&self) -> Vec<Arc<str>> {
        self.props.read().keys().cloned().collect()
    }

    /// Returns true if both handles point at the same object
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.props, &other.props)
    }

    pub(crate) fn id(&self) -> ContainerId {
        ContainerId::of(&self.props)
    }

    fn entries(&self) -> Vec<(Arc<str>, Value)> {
        self.props
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl<K: Into<Arc<str>>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let props: Properties = iter
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            props: Arc::new(RwLock::new(props)),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id())
            .field("keys", &self.keys())
            .finish()
    }
}

/// Any node of a watchable graph.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean leaf
    Bool(bool),
    /// Numeric leaf
    Number(f64),
    /// String leaf
    String(Arc<str>),
    /// Plain ordered sequence
    List(List),
    /// Plain string-keyed container
    Object(Object),
    /// Scalar reactive cell
    Cell(Observable),
    /// Reactive collection
    Collection(ObservableArray),
}

impl Value {
    /// Falsy values: `Null`, `false`, `0`, `NaN` and the empty string.
    ///
    /// A watch treats falsy values as absent and never descends into them.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => *n == 0.0 || n.is_nan(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns true for leaves (everything that is neither a container nor a cell)
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
        )
    }

    /// Returns true for both kinds of reactive cell
    pub fn is_reactive(&self) -> bool {
        matches!(self, Value::Cell(_) | Value::Collection(_))
    }

    /// Numeric payload, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The object handle, if this is an object
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The list handle, if this is a list
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// The scalar cell, if this is one
    pub fn as_cell(&self) -> Option<&Observable> {
        match self {
            Value::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    /// The reactive collection, if this is one
    pub fn as_collection(&self) -> Option<&ObservableArray> {
        match self {
            Value::Collection(array) => Some(array),
            _ => None,
        }
    }

    /// Per-cell watch toggle. Always false for non-cells.
    pub fn is_watchable(&self) -> bool {
        match self {
            Value::Cell(cell) => cell.is_watchable(),
            Value::Collection(array) => array.is_watchable(),
            _ => false,
        }
    }

    pub(crate) fn cell_id(&self) -> Option<CellId> {
        match self {
            Value::Cell(cell) => Some(cell.id()),
            Value::Collection(array) => Some(array.id()),
            _ => None,
        }
    }

    pub(crate) fn container_id(&self) -> Option<ContainerId> {
        match self {
            Value::List(list) => Some(list.id()),
            Value::Object(object) => Some(object.id()),
            _ => None,
        }
    }

    /// Direct children of a plain container, snapshotted so no lock is held
    /// while the caller recurses. Empty for anything else.
    pub(crate) fn children(&self) -> Vec<(Key, Value)> {
        match self {
            Value::List(list) => list
                .to_vec()
                .into_iter()
                .enumerate()
                .map(|(index, value)| (Key::Index(index), value))
                .collect(),
            Value::Object(object) => object
                .entries()
                .into_iter()
                .map(|(name, value)| (Key::Name(name), value))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Primitives compare by value, containers and cells by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Cell(a), Value::Cell(b)) => a.id() == b.id(),
            (Value::Collection(a), Value::Collection(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Value::String(s)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl From<&List> for Value {
    fn from(list: &List) -> Self {
        Value::List(list.clone())
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<&Object> for Value {
    fn from(object: &Object) -> Self {
        Value::Object(object.clone())
    }
}

impl From<Observable> for Value {
    fn from(cell: Observable) -> Self {
        Value::Cell(cell)
    }
}

impl From<&Observable> for Value {
    fn from(cell: &Observable) -> Self {
        Value::Cell(cell.clone())
    }
}

impl From<ObservableArray> for Value {
    fn from(array: ObservableArray) -> Self {
        Value::Collection(array)
    }
}

impl From<&ObservableArray> for Value {
    fn from(array: &ObservableArray) -> Self {
        Value::Collection(array.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
