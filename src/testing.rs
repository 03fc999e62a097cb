//! In-memory fakes and object builders shared by unit tests

use crate::domain::{KubeApi, ResourceClient};
use crate::error::{Error, Result};
use crate::model::{KVPair, Key, ListQuery};
use async_trait::async_trait;
use hyper::{Body, Method, Request, Response};
use k8s_openapi::api::core::v1::{Namespace, Node, NodeSpec, Pod, PodSpec, PodStatus};
use k8s_openapi::api::networking::v1::{NetworkPolicy, NetworkPolicySpec};
use kube::api::ObjectMeta;
use kube::core::ErrorResponse;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

// =============================================================================
// Object Builders
// =============================================================================

/// A running pod labelled `app=<name>`; an empty `node` leaves it unscheduled.
pub fn pod(namespace: &str, name: &str, node: &str, ip: Option<&str>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([("app".to_string(), name.to_string())])),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: (!node.is_empty()).then(|| node.to_string()),
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some("Running".to_string()),
            pod_ip: ip.map(str::to_string),
            ..Default::default()
        }),
    }
}

pub fn namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn node(name: &str, pod_cidr: Option<&str>) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: Some(NodeSpec {
            pod_cidr: pod_cidr.map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A NetworkPolicy selecting every pod in `namespace` with no ingress rules.
pub fn network_policy(namespace: &str, name: &str) -> NetworkPolicy {
    NetworkPolicy {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: Some(NetworkPolicySpec::default()),
        ..Default::default()
    }
}

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} ({})", reason, code),
        reason: reason.to_string(),
        code,
    })
}

fn not_found() -> kube::Error {
    api_error(404, "NotFound")
}

// =============================================================================
// Fake Kubernetes API
// =============================================================================

#[derive(Default)]
struct FakeObjects {
    namespaces: Vec<Namespace>,
    pods: Vec<Pod>,
    network_policies: Vec<NetworkPolicy>,
    nodes: Vec<Node>,
}

/// In-memory [`KubeApi`] holding objects in insertion order
#[derive(Default)]
pub struct FakeKubeApi {
    objects: Mutex<FakeObjects>,
    failure: Mutex<Option<(u16, String)>>,
    calls: AtomicUsize,
}

fn same_name(meta: &ObjectMeta, namespace: Option<&str>, name: &str) -> bool {
    meta.name.as_deref() == Some(name)
        && (namespace.is_none() || meta.namespace.as_deref() == namespace)
}

impl FakeKubeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(self, ns: Namespace) -> Self {
        self.objects.lock().namespaces.push(ns);
        self
    }

    pub fn with_pod(self, pod: Pod) -> Self {
        self.objects.lock().pods.push(pod);
        self
    }

    pub fn with_network_policy(self, np: NetworkPolicy) -> Self {
        self.objects.lock().network_policies.push(np);
        self
    }

    pub fn with_node(self, node: Node) -> Self {
        self.objects.lock().nodes.push(node);
        self
    }

    /// Make every subsequent call fail with the given API status.
    pub fn fail_with(&self, code: u16, reason: &str) {
        *self.failure.lock() = Some((code, reason.to_string()));
    }

    /// Number of calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn node(&self, name: &str) -> Option<Node> {
        self.objects
            .lock()
            .nodes
            .iter()
            .find(|n| same_name(&n.metadata, None, name))
            .cloned()
    }

    pub fn pod(&self, namespace: &str, name: &str) -> Option<Pod> {
        self.objects
            .lock()
            .pods
            .iter()
            .find(|p| same_name(&p.metadata, Some(namespace), name))
            .cloned()
    }

    fn enter(&self) -> std::result::Result<(), kube::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.failure.lock() {
            Some((code, reason)) => Err(api_error(*code, reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl KubeApi for FakeKubeApi {
    async fn list_namespaces(&self) -> std::result::Result<Vec<Namespace>, kube::Error> {
        self.enter()?;
        Ok(self.objects.lock().namespaces.clone())
    }

    async fn get_namespace(&self, name: &str) -> std::result::Result<Namespace, kube::Error> {
        self.enter()?;
        self.objects
            .lock()
            .namespaces
            .iter()
            .find(|n| same_name(&n.metadata, None, name))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn list_pods(&self) -> std::result::Result<Vec<Pod>, kube::Error> {
        self.enter()?;
        Ok(self.objects.lock().pods.clone())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> std::result::Result<Pod, kube::Error> {
        self.enter()?;
        self.pod(namespace, name).ok_or_else(not_found)
    }

    async fn patch_pod_ip(
        &self,
        namespace: &str,
        name: &str,
        ip: &str,
    ) -> std::result::Result<Pod, kube::Error> {
        self.enter()?;
        let mut objects = self.objects.lock();
        let pod = objects
            .pods
            .iter_mut()
            .find(|p| same_name(&p.metadata, Some(namespace), name))
            .ok_or_else(not_found)?;
        pod.status.get_or_insert_with(Default::default).pod_ip = Some(ip.to_string());
        Ok(pod.clone())
    }

    async fn list_network_policies(&self) -> std::result::Result<Vec<NetworkPolicy>, kube::Error> {
        self.enter()?;
        Ok(self.objects.lock().network_policies.clone())
    }

    async fn get_network_policy(
        &self,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<NetworkPolicy, kube::Error> {
        self.enter()?;
        self.objects
            .lock()
            .network_policies
            .iter()
            .find(|np| same_name(&np.metadata, Some(namespace), name))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn list_nodes(&self) -> std::result::Result<Vec<Node>, kube::Error> {
        self.enter()?;
        Ok(self.objects.lock().nodes.clone())
    }

    async fn get_node(&self, name: &str) -> std::result::Result<Node, kube::Error> {
        self.enter()?;
        self.node(name).ok_or_else(not_found)
    }

    async fn patch_node_annotations(
        &self,
        name: &str,
        annotations: BTreeMap<String, Option<String>>,
    ) -> std::result::Result<Node, kube::Error> {
        self.enter()?;
        let mut objects = self.objects.lock();
        let node = objects
            .nodes
            .iter_mut()
            .find(|n| same_name(&n.metadata, None, name))
            .ok_or_else(not_found)?;
        let current = node.metadata.annotations.get_or_insert_with(BTreeMap::new);
        for (k, v) in annotations {
            match v {
                Some(v) => {
                    current.insert(k, v);
                }
                None => {
                    current.remove(&k);
                }
            }
        }
        Ok(node.clone())
    }
}

// =============================================================================
// Fake Resource Client
// =============================================================================

/// Decides whether the n-th call (1-based) of an operation fails
type FailureFn = Box<dyn Fn(usize) -> Option<Error> + Send + Sync>;

/// In-memory [`ResourceClient`] with per-operation failure injection
#[derive(Default)]
pub struct MemoryResourceClient {
    entries: Mutex<Vec<KVPair>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, FailureFn>>,
    revision: AtomicU64,
}

impl MemoryResourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, kvp: KVPair) -> Self {
        self.entries.lock().push(kvp);
        self
    }

    /// Inject failures into `operation` ("ensure_initialized", "get", ...).
    pub fn fail_when(
        self,
        operation: &'static str,
        f: impl Fn(usize) -> Option<Error> + Send + Sync + 'static,
    ) -> Self {
        self.failures.lock().insert(operation, Box::new(f));
        self
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    pub fn entry(&self, key: &Key) -> Option<KVPair> {
        self.entries.lock().iter().find(|e| &e.key == key).cloned()
    }

    fn enter(&self, operation: &'static str) -> Result<()> {
        let attempt = {
            let mut calls = self.calls.lock();
            let n = calls.entry(operation).or_insert(0);
            *n += 1;
            *n
        };
        match self.failures.lock().get(operation).and_then(|f| f(attempt)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn store(&self, mut kvp: KVPair) -> KVPair {
        let rev = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        kvp.revision = Some(rev.to_string());
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|e| e.key == kvp.key) {
            Some(existing) => *existing = kvp.clone(),
            None => entries.push(kvp.clone()),
        }
        kvp
    }
}

#[async_trait]
impl ResourceClient for MemoryResourceClient {
    async fn ensure_initialized(&self) -> Result<()> {
        self.enter("ensure_initialized")
    }

    async fn create(&self, kvp: KVPair) -> Result<KVPair> {
        self.enter("create")?;
        if self.entry(&kvp.key).is_some() {
            return Err(Error::ResourceAlreadyExists {
                identifier: kvp.key.into(),
            });
        }
        Ok(self.store(kvp))
    }

    async fn update(&self, kvp: KVPair) -> Result<KVPair> {
        self.enter("update")?;
        if self.entry(&kvp.key).is_none() {
            return Err(Error::does_not_exist(kvp.key));
        }
        Ok(self.store(kvp))
    }

    async fn apply(&self, kvp: KVPair) -> Result<KVPair> {
        self.enter("apply")?;
        Ok(self.store(kvp))
    }

    async fn delete(&self, kvp: KVPair) -> Result<KVPair> {
        self.enter("delete")?;
        let mut entries = self.entries.lock();
        let idx = entries
            .iter()
            .position(|e| e.key == kvp.key)
            .ok_or_else(|| Error::does_not_exist(&kvp.key))?;
        Ok(entries.remove(idx))
    }

    async fn get(&self, key: &Key) -> Result<KVPair> {
        self.enter("get")?;
        self.entry(key).ok_or_else(|| Error::does_not_exist(key))
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<KVPair>, Option<String>)> {
        self.enter("list")?;
        let entries = self
            .entries
            .lock()
            .iter()
            .filter(|e| query.matches(&e.key))
            .cloned()
            .collect();
        Ok((entries, Some(self.revision.load(Ordering::SeqCst).to_string())))
    }
}

// =============================================================================
// Fake API Server
// =============================================================================

/// In-memory API server for cluster-scoped custom resources.
///
/// Serves `/apis/{group}/{version}/{plural}[/{name}]` with the create, get,
/// list, replace and delete semantics the datastore relies on, including
/// AlreadyExists on create and resourceVersion conflicts on replace.
#[derive(Clone, Default)]
pub struct FakeApiServer {
    objects: Arc<Mutex<BTreeMap<String, serde_json::Value>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    revision: Arc<AtomicU64>,
}

impl FakeApiServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose requests are answered by this server
    pub fn client(&self) -> kube::Client {
        let server = self.clone();
        let service = tower::service_fn(move |req: Request<Body>| {
            let server = server.clone();
            async move { Ok::<_, Infallible>(server.serve(req).await) }
        });
        kube::Client::new(service, "default")
    }

    /// Requests received with the given method
    pub fn requests(&self, method: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    async fn serve(&self, req: Request<Body>) -> Response<Body> {
        let (parts, body) = req.into_parts();
        let body = match hyper::body::to_bytes(body).await {
            Ok(body) => body,
            Err(e) => return status_response(400, "BadRequest", &e.to_string()),
        };
        let path = parts.uri.path().trim_end_matches('/').to_string();
        self.requests
            .lock()
            .push((parts.method.to_string(), path.clone()));
        self.handle(&parts.method, &path, &body)
    }

    fn handle(&self, method: &Method, path: &str, body: &[u8]) -> Response<Body> {
        let segments = path.split('/').filter(|s| !s.is_empty()).count();
        let mut objects = self.objects.lock();

        match (method, segments) {
            (&Method::GET, 5) => match objects.get(path) {
                Some(obj) => json_response(200, obj),
                None => status_response(404, "NotFound", &format!("{} not found", path)),
            },
            (&Method::GET, 4) => {
                let prefix = format!("{}/", path);
                let items: Vec<serde_json::Value> = objects
                    .iter()
                    .filter(|(k, _)| k.starts_with(&prefix))
                    .map(|(_, v)| v.clone())
                    .collect();
                let list = serde_json::json!({
                    "apiVersion": "v1",
                    "kind": "List",
                    "metadata": { "resourceVersion": self.revision.load(Ordering::SeqCst).to_string() },
                    "items": items,
                });
                json_response(200, &list)
            }
            (&Method::POST, 4) => {
                let Ok(mut obj) = serde_json::from_slice::<serde_json::Value>(body) else {
                    return status_response(400, "BadRequest", "invalid object");
                };
                let Some(name) = obj["metadata"]["name"].as_str().map(str::to_string) else {
                    return status_response(422, "Invalid", "metadata.name is required");
                };
                let item = format!("{}/{}", path, name);
                if objects.contains_key(&item) {
                    return status_response(409, "AlreadyExists", &format!("{} already exists", name));
                }
                obj["metadata"]["resourceVersion"] = self.next_revision();
                objects.insert(item, obj.clone());
                json_response(201, &obj)
            }
            (&Method::PUT, 5) => {
                let Ok(mut obj) = serde_json::from_slice::<serde_json::Value>(body) else {
                    return status_response(400, "BadRequest", "invalid object");
                };
                let Some(current) = objects.get(path) else {
                    return status_response(404, "NotFound", &format!("{} not found", path));
                };
                let sent = obj["metadata"]["resourceVersion"].as_str();
                if sent.is_some_and(|rv| Some(rv) != current["metadata"]["resourceVersion"].as_str()) {
                    return status_response(409, "Conflict", "the object has been modified");
                }
                obj["metadata"]["resourceVersion"] = self.next_revision();
                objects.insert(path.to_string(), obj.clone());
                json_response(200, &obj)
            }
            (&Method::DELETE, 5) => match objects.remove(path) {
                Some(obj) => json_response(200, &obj),
                None => status_response(404, "NotFound", &format!("{} not found", path)),
            },
            _ => status_response(405, "MethodNotAllowed", &format!("{} {}", method, path)),
        }
    }

    fn next_revision(&self) -> serde_json::Value {
        let rv = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        serde_json::Value::String(rv.to_string())
    }
}

fn json_response(code: u16, body: &serde_json::Value) -> Response<Body> {
    Response::builder()
        .status(code)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn status_response(code: u16, reason: &str, message: &str) -> Response<Body> {
    json_response(
        code,
        &serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": message,
            "reason": reason,
            "code": code,
        }),
    )
}
