//! Second phase of a module: run the deferred factories against resolved
//! dependencies and compile the reducer.

use crate::composition::merge_handlers;
use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::module::{Module, ModuleDraft, ReactionContext, SagaContext, ThunkContext};
use crate::reducer::ModuleReducer;
use crate::resolver::Dependencies;
use std::sync::Arc;

/// Resolve `draft` into a [`Module`].
///
/// Own handlers (plain and fetchable) are merged with reaction handlers
/// according to `config.conflict_policy`, then compiled into one reducer.
pub(crate) fn compose(draft: ModuleDraft, deps: Dependencies, config: &RegistryConfig) -> Result<Module> {
    let ModuleDraft {
        name,
        initial_state,
        inject,
        types,
        actions,
        selectors,
        handlers,
        reactions,
        sagas,
        thunks,
    } = draft;

    if let Some(missing) = inject.iter().find(|dep| !deps.contains(dep)) {
        return Err(Error::MissingDependency {
            dependency: missing.clone(),
            module: name,
        });
    }

    let reaction_handlers = match reactions {
        Some(f) => f(&ReactionContext {
            initial_state: &initial_state,
            types: &types,
            deps: &deps,
        })?
        .into_handlers(),
        None => Default::default(),
    };
    let reaction_count = reaction_handlers.len();

    let merged = merge_handlers(&name, handlers, reaction_handlers, config.conflict_policy)?;
    let reducer = ModuleReducer::new(name.clone(), initial_state.clone(), merged);

    let sagas = match sagas {
        Some(f) => f(&SagaContext {
            types: &types,
            actions: &actions,
            deps: &deps,
        })?,
        None => Vec::new(),
    };

    tracing::debug!(
        module = %name,
        reactions = reaction_count,
        sagas = sagas.len(),
        thunks = thunks.len(),
        "Module resolved"
    );

    let thunk_context = Arc::new(ThunkContext {
        actions: Arc::clone(&actions),
        deps,
    });

    Ok(Module {
        name,
        initial_state,
        inject,
        types,
        actions,
        selectors,
        reducer: Arc::new(reducer),
        sagas,
        thunks,
        thunk_context,
    })
}

#[cfg(test)]
mod tests {
    use crate::config::{ConflictPolicy, RegistryConfig};
    use crate::effect::{Effect, take_every};
    use crate::error::Error;
    use crate::module::{ActionMap, ModuleDefinition, ModuleDraft, ReactionMap};
    use crate::reducer::Reducer;
    use crate::resolver::Dependencies;
    use crate::Action;
    use serde_json::json;

    fn build(definition: ModuleDefinition) -> ModuleDraft {
        match definition.build() {
            Ok(draft) => draft,
            Err(e) => unreachable!("definition should build: {e}"),
        }
    }

    fn source() -> ModuleDraft {
        build(ModuleDefinition::new("test1").state(json!({})).actions(|_| ActionMap::new().noop("doSomething")))
    }

    #[test]
    fn test_reaction_to_dependency_type() {
        let test1 = source();
        let deps = Dependencies::none("test2").with("test1", test1.handle());

        let test2 = build(
            ModuleDefinition::new("test2")
                .inject(["test1"])
                .state(json!({ "field": 1 }))
                .actions(|_| ActionMap::new().reducer("doSomethingElse", |_, _| json!({ "field": 2 })))
                .reactions(|ctx| {
                    let ty = ctx.deps.get("test1")?.types.require("doSomething")?;
                    Ok(ReactionMap::new().on(ty, |_, _| json!({ "field": 3 })))
                }),
        );

        let Ok(module) = test2.with_dependencies(deps) else {
            unreachable!("test1 is available");
        };
        let reducer = module.reducer();
        let next = reducer.reduce(module.initial_state(), &Action::new("test1/doSomething"));
        assert_eq!(next, json!({ "field": 3 }));
        let next = reducer.reduce(module.initial_state(), &Action::new("test2/doSomethingElse"));
        assert_eq!(next, json!({ "field": 2 }));
    }

    #[test]
    fn test_missing_injected_handle() {
        let draft = build(ModuleDefinition::new("test2").inject(["test1"]).actions(|_| ActionMap::new()));
        let err = draft.with_dependencies(Dependencies::none("test2")).err();
        assert!(matches!(
            err,
            Some(Error::MissingDependency { ref dependency, ref module }) if dependency == "test1" && module == "test2"
        ));
    }

    #[test]
    fn test_reaction_factory_errors_propagate() {
        let draft = build(ModuleDefinition::new("test2").actions(|_| ActionMap::new()).reactions(|ctx| {
            ctx.deps.get("ghost")?;
            Ok(ReactionMap::new())
        }));
        let err = draft.with_dependencies(Dependencies::none("test2")).err();
        assert!(matches!(err, Some(Error::NotInjected { .. })));
    }

    #[test]
    fn test_conflict_policy_is_applied() {
        let draft = build(
            ModuleDefinition::new("test")
                .actions(|_| ActionMap::new().reducer("a", |_, _| json!({ "by": "own" })))
                .reactions(|ctx| {
                    let ty = ctx.types.require("a")?;
                    Ok(ReactionMap::new().on(ty, |_, _| json!({ "by": "reaction" })))
                }),
        );
        let config = RegistryConfig::default().with_conflict_policy(ConflictPolicy::Reject);
        let err = super::compose(draft, Dependencies::none("test"), &config).err();
        assert!(matches!(err, Some(Error::HandlerConflict { .. })));
    }

    #[test]
    fn test_sagas_and_thunks_are_bound() {
        let test1 = source();
        let deps = Dependencies::none("test2").with("test1", test1.handle());
        let draft = build(
            ModuleDefinition::new("test2")
                .inject(["test1"])
                .actions(|_| ActionMap::new().noop("ping"))
                .sagas(|ctx| {
                    let ping = ctx.types.require("ping")?;
                    let other = ctx.deps.get("test1")?.types.require("doSomething")?;
                    Ok(vec![take_every([ping, other], |_| Effect::None)])
                })
                .thunk("pingBoth", |_, ctx| {
                    let own = ctx.actions.create("ping", None);
                    let other = ctx.deps.get("test1").and_then(|d| d.actions.create("doSomething", None));
                    match (own, other) {
                        (Ok(own), Ok(other)) => crate::put![own, other],
                        _ => Effect::None,
                    }
                }),
        );

        let Ok(module) = draft.with_dependencies(deps) else {
            unreachable!("test1 is available");
        };
        assert_eq!(module.sagas().len(), 1);
        assert_eq!(module.sagas()[0].patterns(), ["test2/ping".to_string(), "test1/doSomething".to_string()]);

        let effect = module.thunk("pingBoth", None);
        assert!(matches!(effect, Ok(Effect::Sequential(ref effects)) if effects.len() == 2));
        assert!(matches!(module.thunk("nope", None), Err(Error::UnknownThunk { .. })));
    }
}
