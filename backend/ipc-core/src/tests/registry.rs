// Unit tests for the binding registry: conflicts, naming, inheritance precedence

use crate::contract::MessageKind;
use crate::error::{CallError, ContractError};
use crate::registry::{ClassBindings, Declaration, Member, MemberKey};

use serde_json::{Value, json};

struct Base {
    label: &'static str,
}

impl Base {
    fn foo(&self, _args: Vec<Value>) -> Result<Value, CallError> {
        Ok(json!(format!("base:{}", self.label)))
    }

    fn version(&self, _args: Vec<Value>) -> Result<Value, CallError> {
        Ok(json!(1))
    }
}

struct Derived {
    base: Base,
}

impl Derived {
    fn foo(&self, _args: Vec<Value>) -> Result<Value, CallError> {
        Ok(json!(format!("derived:{}", self.base.label)))
    }
}

fn derived_base(derived: &Derived) -> &Base {
    &derived.base
}

fn base_bindings() -> ClassBindings<Base> {
    ClassBindings::new("Base")
        .with(Declaration::sync_method("calc", "foo", |base: &Base, args: Vec<Value>| {
            base.foo(args)
        }))
        .and_then(|b| {
            b.with(Declaration::sync_method(
                "calc",
                "version",
                |base: &Base, args: Vec<Value>| base.version(args),
            ))
        })
        .expect("base declarations are valid")
}

fn call_sync<T>(member: &Member<T>, instance: &T) -> Value {
    match member {
        Member::Sync(handler) => handler(instance, Vec::new()).expect("handler succeeds"),
        _ => panic!("Expected a sync member"),
    }
}

/// **VALUE**: Verifies a second binding for the same (channel, name) on one type fails,
/// whatever kind either binding has.
///
/// **WHY THIS MATTERS**: Two members answering one message name would make dispatch depend
/// on declaration order. The conflict must surface at declaration time, not at call time.
///
/// **BUG THIS CATCHES**: Would catch the check only comparing names within the same kind,
/// or the conflict message not naming the earlier kind.
#[test]
fn given_bound_name_when_declaring_it_again_with_any_kind_then_returns_conflict() {
    for requested in [
        MessageKind::AsyncMethod,
        MessageKind::SyncMethod,
        MessageKind::Event,
    ] {
        // GIVEN: "foo" already bound as a sync method
        let mut bindings = base_bindings();

        // WHEN: Declaring "foo" again on the same channel
        let result = bindings.declare(Declaration::stub("calc", "foo", requested));

        // THEN: Conflict naming the earlier kind
        match result {
            Err(ContractError::Conflict {
                existing, message, ..
            }) => {
                assert_eq!(existing, MessageKind::SyncMethod);
                assert!(
                    message.contains("sync method"),
                    "Message should name the earlier kind: {message}"
                );
            }
            other => panic!("Expected Conflict for {requested}, got {other:?}"),
        }
    }
}

#[test]
fn given_same_name_on_other_channel_when_declaring_then_succeeds() {
    let mut bindings = base_bindings();

    let result = bindings.declare(Declaration::sync_method(
        "other",
        "foo",
        |base: &Base, args: Vec<Value>| base.foo(args),
    ));

    assert!(result.is_ok(), "Channels have independent tables");
    assert_eq!(bindings.channels(), vec!["calc", "other"]);
}

/// **VALUE**: Verifies symbol-keyed members must be given an explicit message name.
///
/// **WHY THIS MATTERS**: A symbol key has no stable textual name the client could use.
///
/// **BUG THIS CATCHES**: Would catch the symbol description silently becoming the wire name.
#[test]
fn given_symbol_member_without_name_when_declaring_then_returns_unnamed_member() {
    let mut bindings: ClassBindings<Base> = ClassBindings::new("Base");

    let unnamed = bindings.declare(Declaration::stub(
        "calc",
        MemberKey::Symbol("Symbol(refresh)"),
        MessageKind::AsyncMethod,
    ));
    assert!(matches!(unnamed, Err(ContractError::UnnamedMember { .. })));

    let named = bindings.declare(
        Declaration::stub(
            "calc",
            MemberKey::Symbol("Symbol(refresh)"),
            MessageKind::AsyncMethod,
        )
        .named("refresh"),
    );
    assert!(named.is_ok());
    assert_eq!(bindings.resolve("calc")[0].name, "refresh");
}

/// **VALUE**: Verifies derived bindings override base bindings of the same name.
///
/// **WHY THIS MATTERS**: Resolution keeps the first entry seen walking from most derived to
/// root. If the base entry won, overriding a handler in a derived service would be impossible.
///
/// **BUG THIS CATCHES**: Would catch resolution walking root-first, or yielding duplicates.
#[test]
fn given_derived_override_when_resolving_then_yields_single_derived_entry() {
    // GIVEN: Base binds "foo" and "version"; Derived overrides "foo"
    let base = base_bindings();
    let derived = ClassBindings::extending("Derived", &base, derived_base)
        .with(Declaration::sync_method(
            "calc",
            "foo",
            |derived: &Derived, args: Vec<Value>| derived.foo(args),
        ))
        .expect("override is not a conflict");

    // WHEN: Resolving the channel
    let resolved = derived.resolve("calc");

    // THEN: One "foo", declared by Derived and bound to its handler
    let foos: Vec<_> = resolved.iter().filter(|b| b.name == "foo").collect();
    assert_eq!(foos.len(), 1, "Exactly one entry per name");
    assert_eq!(foos[0].declared_by, "Derived");

    let instance = Derived {
        base: Base { label: "x" },
    };
    assert_eq!(call_sync(&foos[0].entry.member, &instance), json!("derived:x"));

    // AND: The inherited "version" still reaches the base through the projection
    let version = resolved
        .iter()
        .find(|b| b.name == "version")
        .expect("inherited binding");
    assert_eq!(version.declared_by, "Base");
    assert_eq!(call_sync(&version.entry.member, &instance), json!(1));
}

#[test]
fn given_guarded_base_when_extending_then_derived_inherits_guard_with_own_name() {
    let base: ClassBindings<Base> = ClassBindings::new("Base").host_only();

    let derived = ClassBindings::extending("Derived", &base, derived_base);

    assert_eq!(
        derived.guard().context(),
        Some(crate::affinity::ProcessContext::Host)
    );
    assert_eq!(derived.guard().display_name(), "HostDerived");
}
