//! Service Module Tests
//!
//! ## Test Scopes
//! - **Signatures**: argument kinds, method keys and wildcard matching.
//! - **ServiceContext**: registration, lookup and execution of methods.
//! - **LocalServiceRegistry**: topology bookkeeping for local and remote deployments.

#[cfg(test)]
mod tests {
    use crate::cluster::NodeId;
    use crate::service::{
        ArgKind, BUILTIN_SERVICES, LocalServiceRegistry, MethodKey, ServiceContext,
        ServiceRegistry, builtin,
        TopologySnapshot,
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn calculator() -> ServiceContext {
        ServiceContext::new("calculator").method(
            "add",
            &[ArgKind::Number, ArgKind::Number],
            |args| async move {
                let a = args[0].as_f64().unwrap_or_default();
                let b = args[1].as_f64().unwrap_or_default();
                Ok(json!(a + b))
            },
        )
    }

    // ============================================================
    // SIGNATURE TESTS
    // ============================================================

    #[test]
    fn test_arg_kind_of_json_values() {
        assert_eq!(ArgKind::of(&Value::Null), ArgKind::Null);
        assert_eq!(ArgKind::of(&json!(true)), ArgKind::Bool);
        assert_eq!(ArgKind::of(&json!(1.5)), ArgKind::Number);
        assert_eq!(ArgKind::of(&json!("x")), ArgKind::String);
        assert_eq!(ArgKind::of(&json!([1])), ArgKind::Array);
        assert_eq!(ArgKind::of(&json!({"k": 1})), ArgKind::Object);
    }

    #[test]
    fn test_method_key_for_call() {
        let key = MethodKey::for_call("add", &[json!(1), json!(2)]);

        assert_eq!(key, MethodKey::new("add", &[ArgKind::Number, ArgKind::Number]));
        assert_eq!(key.to_string(), "add(number, number)");
    }

    #[test]
    fn test_wildcard_signature_matching() {
        let registered = MethodKey::new("echo", &[ArgKind::Any]);

        assert!(registered.matches(&MethodKey::for_call("echo", &[json!("hi")])));
        assert!(registered.matches(&MethodKey::for_call("echo", &[json!({"a": 1})])));
        assert!(!registered.matches(&MethodKey::for_call("echo", &[])));
        assert!(!registered.matches(&MethodKey::for_call("other", &[json!(1)])));
    }

    // ============================================================
    // SERVICE CONTEXT TESTS
    // ============================================================

    #[tokio::test]
    async fn test_context_register_and_call() {
        // ARRANGE
        let service = calculator();
        let key = MethodKey::for_call("add", &[json!(2), json!(3)]);

        // ACT
        let handler = service.lookup(&key).expect("add should be registered");
        let result = handler(vec![json!(2), json!(3)]).await.unwrap();

        // ASSERT
        assert_eq!(result, json!(5.0));
        assert_eq!(service.method_count(), 1);
        assert_eq!(service.name(), "calculator");
    }

    #[test]
    fn test_context_lookup_rejects_wrong_shape() {
        let service = calculator();

        assert!(!service.has_method(&MethodKey::for_call("add", &[json!("2"), json!(3)])));
        assert!(!service.has_method(&MethodKey::for_call("add", &[json!(2)])));
        assert!(!service.has_method(&MethodKey::for_call("sub", &[json!(2), json!(3)])));
    }

    #[tokio::test]
    async fn test_context_exact_signature_wins_over_wildcard() {
        let service = ServiceContext::new("echo")
            .method("echo", &[ArgKind::Any], |args| async move { Ok(args[0].clone()) })
            .method("echo", &[ArgKind::String], |_| async { Ok(json!("exact")) });

        let exact = service
            .lookup(&MethodKey::for_call("echo", &[json!("hi")]))
            .unwrap();
        let wildcard = service
            .lookup(&MethodKey::for_call("echo", &[json!(7)]))
            .unwrap();

        assert_eq!(exact(vec![json!("hi")]).await.unwrap(), json!("exact"));
        assert_eq!(wildcard(vec![json!(7)]).await.unwrap(), json!(7));
    }

    #[tokio::test]
    async fn test_context_handler_error_is_returned() {
        let service = ServiceContext::new("broken").method("fail", &[], |_| async {
            Err(anyhow::anyhow!("Intentional error"))
        });

        let handler = service.lookup(&MethodKey::new("fail", &[])).unwrap();
        let err = handler(vec![]).await.unwrap_err();

        assert!(err.to_string().contains("Intentional error"));
    }

    #[tokio::test]
    async fn test_context_reregistration_replaces_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = ServiceContext::new("counter");

        service.register("hit", &[], |_| async { Ok(json!("old")) });
        let counter = calls.clone();
        service.register("hit", &[], move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!("new"))
            }
        });

        let handler = service.lookup(&MethodKey::new("hit", &[])).unwrap();

        assert_eq!(handler(vec![]).await.unwrap(), json!("new"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.list_methods().len(), 1);
    }

    // ============================================================
    // REGISTRY TESTS
    // ============================================================

    #[test]
    fn test_registry_deploy_local_sets_local_count() {
        // ARRANGE
        let registry = LocalServiceRegistry::new(NodeId::from("local"));

        // ACT
        registry.deploy_local(calculator());

        // ASSERT
        let topology = registry.topology("calculator").unwrap();
        assert_eq!(topology.get(&NodeId::from("local")), Some(&1));
        assert!(registry.local_handle("calculator").is_some());
    }

    #[test]
    fn test_registry_deploy_keeps_higher_local_count() {
        let registry = LocalServiceRegistry::new(NodeId::from("local"));
        registry.set_instances("calculator", NodeId::from("local"), 4);

        registry.deploy_local(calculator());

        let topology = registry.topology("calculator").unwrap();
        assert_eq!(topology.get(&NodeId::from("local")), Some(&4));
    }

    #[test]
    fn test_registry_undeploy_zeroes_local_count() {
        let registry = LocalServiceRegistry::new(NodeId::from("local"));
        registry.set_instances("calculator", NodeId::from("remote"), 2);
        registry.deploy_local(calculator());

        let removed = registry.undeploy_local("calculator");

        assert!(removed.is_some());
        assert!(registry.local_handle("calculator").is_none());
        let topology = registry.topology("calculator").unwrap();
        assert_eq!(topology.get(&NodeId::from("local")), Some(&0));
        assert_eq!(topology.get(&NodeId::from("remote")), Some(&2));
    }

    #[test]
    fn test_registry_deployed_services_sorted() {
        let registry = LocalServiceRegistry::new(NodeId::from("local"));
        let mut topology = TopologySnapshot::new();
        topology.insert(NodeId::from("a"), 2);
        topology.insert(NodeId::from("b"), 1);

        registry.set_topology("zeta", topology.clone());
        registry.set_topology("alpha", topology);

        let services = registry.deployed_services();
        let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(services[0].total_instances(), 3);
    }

    #[test]
    fn test_registry_remove_service() {
        let registry = LocalServiceRegistry::new(NodeId::from("local"));
        registry.deploy_local(calculator());

        registry.remove_service("calculator");

        assert!(registry.topology("calculator").is_none());
        assert!(registry.local_handle("calculator").is_none());
        assert_eq!(registry.service_count(), 0);
    }

    #[test]
    fn test_registry_unknown_service_has_no_topology() {
        let registry = LocalServiceRegistry::new(NodeId::from("local"));

        assert!(registry.topology("missing").is_none());
        assert!(registry.deployed_services().is_empty());
    }

    // ============================================================
    // BUILT-IN SERVICE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_builtin_services() {
        for &name in BUILTIN_SERVICES {
            let service = builtin(name).unwrap();
            assert_eq!(service.name(), name);
            assert!(service.method_count() > 0);
        }
        assert!(builtin("unknown").is_none());

        let echo = builtin("echo").unwrap();
        let handler = echo.lookup(&MethodKey::for_call("echo", &[json!({"k": 1})])).unwrap();
        assert_eq!(handler(vec![json!({"k": 1})]).await.unwrap(), json!({"k": 1}));

        let calculator = builtin("calculator").unwrap();
        let add = calculator
            .lookup(&MethodKey::for_call("add", &[json!(1), json!(2)]))
            .unwrap();
        assert_eq!(add(vec![json!(1), json!(2.5)]).await.unwrap(), json!(3.5));
    }

    #[test]
    fn test_registry_topology_lookup_matches_descriptors() {
        // ARRANGE
        let registry = LocalServiceRegistry::new(NodeId::from("local"));
        registry.set_instances("beta", NodeId::from("b"), 2);
        registry.set_instances("alpha", NodeId::from("a"), 1);
        registry.set_instances("alpha", NodeId::from("c"), 0);
        registry.deploy_local(calculator());

        // ACT
        let descriptors = registry.deployed_services();

        // ASSERT
        assert_eq!(descriptors.len(), 3);
        for descriptor in &descriptors {
            assert_eq!(
                registry.topology(&descriptor.name).as_ref(),
                Some(&descriptor.topology)
            );
        }

        // Snapshots are copies: later changes do not leak into them.
        let before = registry.topology("alpha").unwrap();
        registry.set_instances("alpha", NodeId::from("a"), 5);
        assert_eq!(before.get(&NodeId::from("a")), Some(&1));
        assert_eq!(
            registry.topology("alpha").unwrap().get(&NodeId::from("a")),
            Some(&5)
        );
    }
}
