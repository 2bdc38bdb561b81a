//! Binding registry.
//!
//! A type claims contract message names for its members by declaring
//! [`Declaration`]s into its [`ClassBindings`]. Declarations are checked for
//! conflicts as they are made; an endpoint later walks the bindings once per
//! instance ([`ClassBindings::resolve`]) to learn everything it must wire.
//!
//! # Inheritance
//!
//! Rust has no class hierarchy, so "derived" types embed their base and build
//! their bindings with [`ClassBindings::extending`], which lifts every base
//! table onto the derived type through a projection `fn(&Derived) -> &Base`.
//! The result is an explicit ordered list of tables, most-derived first.
//! Resolution keeps the first entry seen per message name: a derived
//! declaration overrides the base one, and a derived type that does not repeat
//! a declaration inherits the base binding untouched.

pub mod global;

pub use global::{Contracted, bindings_for, is_registered};

use crate::affinity::ContextGuard;
use crate::contract::{Channel, Converter, MessageKind};
use crate::error::{CallError, ContractError};
use crate::host::LocalEvent;

use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter, Result as FormatResult};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use log::debug;
use serde_json::Value;

pub type AsyncMember<T> = Arc<
    dyn for<'a> Fn(&'a T, Vec<Value>) -> BoxFuture<'a, Result<Value, CallError>> + Send + Sync,
>;
pub type SyncMember<T> = Arc<dyn Fn(&T, Vec<Value>) -> Result<Value, CallError> + Send + Sync>;
pub type EventMember<T> = Arc<dyn Fn(&T) -> LocalEvent + Send + Sync>;

fn async_member<T, F>(handler: F) -> AsyncMember<T>
where
    T: 'static,
    F: for<'a> Fn(&'a T, Vec<Value>) -> BoxFuture<'a, Result<Value, CallError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(handler)
}

/// How a member is keyed on its type.
///
/// `Ident` members default their message name to the identifier. `Symbol`
/// members (anonymous or computed keys) have no usable name and must be given
/// one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKey {
    Ident(&'static str),
    Symbol(&'static str),
}

impl From<&'static str> for MemberKey {
    fn from(name: &'static str) -> Self {
        MemberKey::Ident(name)
    }
}

/// What a binding points at.
pub enum Member<T> {
    /// Host async handler.
    Async(AsyncMember<T>),
    /// Host sync handler. A plain function: it cannot await.
    Sync(SyncMember<T>),
    /// Host event source.
    Event(EventMember<T>),
    /// Client call stub or event sink. Carries no behavior of its own.
    Stub,
}

impl<T> Clone for Member<T> {
    fn clone(&self) -> Self {
        match self {
            Member::Async(f) => Member::Async(Arc::clone(f)),
            Member::Sync(f) => Member::Sync(Arc::clone(f)),
            Member::Event(f) => Member::Event(Arc::clone(f)),
            Member::Stub => Member::Stub,
        }
    }
}

impl<T> Member<T> {
    fn lift<D>(&self, project: fn(&D) -> &T) -> Member<D>
    where
        T: 'static,
        D: 'static,
    {
        match self {
            Member::Async(f) => {
                let f = Arc::clone(f);
                Member::Async(async_member(move |derived: &D, args: Vec<Value>| {
                    f(project(derived), args)
                }))
            }
            Member::Sync(f) => {
                let f = Arc::clone(f);
                Member::Sync(Arc::new(move |derived: &D, args: Vec<Value>| {
                    f(project(derived), args)
                }))
            }
            Member::Event(f) => {
                let f = Arc::clone(f);
                Member::Event(Arc::new(move |derived: &D| f(project(derived))))
            }
            Member::Stub => Member::Stub,
        }
    }
}

/// A registered association between a message name and a member.
///
/// Never mutated after declaration.
pub struct BindingEntry<T> {
    pub kind: MessageKind,
    pub member_key: MemberKey,
    pub member: Member<T>,
    pub converter: Option<Converter>,
}

impl<T> Clone for BindingEntry<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            member_key: self.member_key,
            member: self.member.clone(),
            converter: self.converter.clone(),
        }
    }
}

impl<T> Debug for BindingEntry<T> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter
            .debug_struct("BindingEntry")
            .field("kind", &self.kind)
            .field("member_key", &self.member_key)
            .field("converter", &self.converter.is_some())
            .finish()
    }
}

/// One member's claim on a channel message name.
pub struct Declaration<T> {
    channel: String,
    member_key: MemberKey,
    explicit_name: Option<String>,
    kind: MessageKind,
    member: Member<T>,
    converter: Option<Converter>,
}

impl<T: Send + Sync + 'static> Declaration<T> {
    pub fn async_method<F>(channel: &str, member: impl Into<MemberKey>, handler: F) -> Self
    where
        F: for<'a> Fn(&'a T, Vec<Value>) -> BoxFuture<'a, Result<Value, CallError>>
            + Send
            + Sync
            + 'static,
    {
        Self::new(
            channel,
            member.into(),
            MessageKind::AsyncMethod,
            Member::Async(async_member(handler)),
        )
    }

    /// Declare a sync handler.
    ///
    /// The handler runs inside the transport's synchronous reply path, so it
    /// must return immediately; the signature leaves no room to await.
    pub fn sync_method<F>(channel: &str, member: impl Into<MemberKey>, handler: F) -> Self
    where
        F: Fn(&T, Vec<Value>) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self::new(
            channel,
            member.into(),
            MessageKind::SyncMethod,
            Member::Sync(Arc::new(handler)),
        )
    }

    pub fn event_source<F>(channel: &str, member: impl Into<MemberKey>, source: F) -> Self
    where
        F: Fn(&T) -> LocalEvent + Send + Sync + 'static,
    {
        Self::new(
            channel,
            member.into(),
            MessageKind::Event,
            Member::Event(Arc::new(source)),
        )
    }

    /// Declare a client-side stub (call stub or event sink) of `kind`.
    pub fn stub(channel: &str, member: impl Into<MemberKey>, kind: MessageKind) -> Self {
        Self::new(channel, member.into(), kind, Member::Stub)
    }
}

impl<T> Declaration<T> {
    fn new(channel: &str, member_key: MemberKey, kind: MessageKind, member: Member<T>) -> Self {
        Self {
            channel: channel.to_string(),
            member_key,
            explicit_name: None,
            kind,
            member,
            converter: None,
        }
    }

    /// Use `name` on the wire instead of the member's identifier.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.explicit_name = Some(name.into());
        self
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    #[track_caller]
    fn message_name(&self, class_name: &str) -> Result<String, ContractError> {
        match (&self.explicit_name, self.member_key) {
            (Some(name), _) => Ok(name.clone()),
            (None, MemberKey::Ident(name)) => Ok(name.to_string()),
            (None, MemberKey::Symbol(description)) => {
                Err(ContractError::unnamed_member(class_name, description))
            }
        }
    }
}

/// Per (type, channel) table from message name to binding entry, in
/// declaration order.
pub struct BindingTable<T> {
    entries: Vec<(String, BindingEntry<T>)>,
    index: HashMap<String, usize>,
}

impl<T> Default for BindingTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Clone for BindingTable<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            index: self.index.clone(),
        }
    }
}

impl<T> BindingTable<T> {
    pub fn get(&self, name: &str) -> Option<&BindingEntry<T>> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindingEntry<T>)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: String, entry: BindingEntry<T>) {
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, entry));
    }

    fn lift<D>(&self, project: fn(&D) -> &T) -> BindingTable<D>
    where
        T: 'static,
        D: 'static,
    {
        let mut lifted = BindingTable::default();
        for (name, entry) in &self.entries {
            lifted.insert(
                name.clone(),
                BindingEntry {
                    kind: entry.kind,
                    member_key: entry.member_key,
                    member: entry.member.lift(project),
                    converter: entry.converter.clone(),
                },
            );
        }
        lifted
    }
}

/// Tables declared by one type, keyed by channel.
struct ClassTables<T> {
    class_name: &'static str,
    tables: HashMap<String, BindingTable<T>>,
}

impl<T> Clone for ClassTables<T> {
    fn clone(&self) -> Self {
        Self {
            class_name: self.class_name,
            tables: self.tables.clone(),
        }
    }
}

/// A binding found by [`ClassBindings::resolve`].
pub struct ResolvedBinding<T> {
    pub name: String,
    pub declared_by: &'static str,
    pub entry: BindingEntry<T>,
}

/// All bindings of a type: its own tables followed by its ancestors', most
/// derived first.
pub struct ClassBindings<T> {
    own: ClassTables<T>,
    ancestors: Vec<ClassTables<T>>,
    guard: ContextGuard,
}

impl<T: Send + Sync + 'static> ClassBindings<T> {
    pub fn new(class_name: &'static str) -> Self {
        Self {
            own: ClassTables {
                class_name,
                tables: HashMap::new(),
            },
            ancestors: Vec::new(),
            guard: ContextGuard::unguarded(class_name),
        }
    }

    /// Start the bindings of a type that embeds `B`.
    ///
    /// Every table of `base` (its own and its ancestors') is lifted through
    /// `project`. The base's context guard carries over.
    pub fn extending<B>(
        class_name: &'static str,
        base: &ClassBindings<B>,
        project: fn(&T) -> &B,
    ) -> Self
    where
        B: Send + Sync + 'static,
    {
        let mut ancestors = Vec::with_capacity(base.ancestors.len() + 1);
        for tables in std::iter::once(&base.own).chain(base.ancestors.iter()) {
            ancestors.push(ClassTables {
                class_name: tables.class_name,
                tables: tables
                    .tables
                    .iter()
                    .map(|(channel, table)| (channel.clone(), table.lift(project)))
                    .collect(),
            });
        }

        let mut guard = ContextGuard::unguarded(class_name);
        if let Some(context) = base.guard.context() {
            guard = guard.guard(context);
        }

        Self {
            own: ClassTables {
                class_name,
                tables: HashMap::new(),
            },
            ancestors,
            guard,
        }
    }

    pub fn host_only(mut self) -> Self {
        self.guard = self.guard.host_only();
        self
    }

    pub fn client_only(mut self) -> Self {
        self.guard = self.guard.client_only();
        self
    }

    pub fn guard(&self) -> &ContextGuard {
        &self.guard
    }

    pub fn class_name(&self) -> &'static str {
        self.own.class_name
    }

    /// Record a declaration on this type.
    ///
    /// # Errors
    ///
    /// - [`ContractError::InvalidChannel`] for a malformed channel name
    /// - [`ContractError::UnnamedMember`] for a symbol member without an explicit name
    /// - [`ContractError::Conflict`] if this type already bound the name on the
    ///   channel, whatever the earlier kind
    #[track_caller]
    pub fn declare(&mut self, declaration: Declaration<T>) -> Result<(), ContractError> {
        let channel = Channel::new(declaration.channel.as_str())?;
        let name = declaration.message_name(self.own.class_name)?;
        let table = self
            .own
            .tables
            .entry(channel.as_str().to_string())
            .or_default();

        if let Some(existing) = table.get(&name) {
            return Err(ContractError::conflict(
                self.own.class_name,
                channel.as_str(),
                &name,
                existing.kind,
                declaration.kind,
            ));
        }

        debug!(
            "{} binds '{name}' on channel '{channel}' as {}",
            self.own.class_name, declaration.kind
        );

        table.insert(
            name,
            BindingEntry {
                kind: declaration.kind,
                member_key: declaration.member_key,
                member: declaration.member,
                converter: declaration.converter,
            },
        );
        Ok(())
    }

    /// Chaining form of [`declare`](Self::declare).
    #[track_caller]
    pub fn with(mut self, declaration: Declaration<T>) -> Result<Self, ContractError> {
        self.declare(declaration)?;
        Ok(self)
    }

    /// Every binding for `channel`, deduplicated by message name, most
    /// derived first.
    pub fn resolve(&self, channel: &str) -> Vec<ResolvedBinding<T>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for tables in std::iter::once(&self.own).chain(self.ancestors.iter()) {
            let Some(table) = tables.tables.get(channel) else {
                continue;
            };
            for (name, entry) in table.iter() {
                if seen.insert(name.to_string()) {
                    resolved.push(ResolvedBinding {
                        name: name.to_string(),
                        declared_by: tables.class_name,
                        entry: entry.clone(),
                    });
                }
            }
        }

        resolved
    }

    /// Channels this type (or an ancestor) binds on.
    pub fn channels(&self) -> Vec<&str> {
        let mut channels: Vec<&str> = std::iter::once(&self.own)
            .chain(self.ancestors.iter())
            .flat_map(|tables| tables.tables.keys().map(String::as_str))
            .collect();
        channels.sort_unstable();
        channels.dedup();
        channels
    }
}
