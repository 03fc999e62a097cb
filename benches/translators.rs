//! Benchmark for the entity translators
//!
//! Snapshots translate every pod, namespace and NetworkPolicy in the cluster,
//! so these run once per object per sync.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use k8s_openapi::api::core::v1::{Namespace, Pod, PodSpec, PodStatus};
use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicyPort,
    NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kdd_datastore::convert::{
    namespace_to_profile, network_policy_to_policy, pod_to_workload_endpoint,
};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

fn labels(n: usize) -> BTreeMap<String, String> {
    (0..n)
        .map(|i| (format!("label-{}", i), format!("value-{}", i)))
        .collect()
}

fn pod(i: usize) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(format!("pod-{}", i)),
            namespace: Some("default".to_string()),
            labels: Some(labels(8)),
            resource_version: Some(i.to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: Some("node-1".to_string()),
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some("Running".to_string()),
            pod_ip: Some(format!("10.0.{}.{}", i / 256, i % 256)),
            ..Default::default()
        }),
    }
}

fn network_policy() -> NetworkPolicy {
    NetworkPolicy {
        metadata: ObjectMeta {
            name: Some("allow-frontend".to_string()),
            namespace: Some("default".to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: Some(NetworkPolicySpec {
            pod_selector: LabelSelector {
                match_labels: Some(labels(2)),
                ..Default::default()
            },
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: Some(vec![NetworkPolicyPeer {
                    pod_selector: Some(LabelSelector {
                        match_labels: Some(labels(3)),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ports: Some(vec![
                    NetworkPolicyPort {
                        port: Some(IntOrString::Int(80)),
                        protocol: Some("TCP".to_string()),
                        ..Default::default()
                    },
                    NetworkPolicyPort {
                        port: Some(IntOrString::Int(443)),
                        protocol: Some("TCP".to_string()),
                        ..Default::default()
                    },
                ]),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn bench_workload_endpoints(c: &mut Criterion) {
    let mut group = c.benchmark_group("translators");
    group.throughput(Throughput::Elements(1));

    let pods: Vec<Pod> = (0..1000).map(pod).collect();
    group.bench_function("pod_to_workload_endpoint", |b| {
        let mut counter = 0usize;
        b.iter(|| {
            counter += 1;
            let _ = pod_to_workload_endpoint(black_box(&pods[counter % pods.len()]));
        });
    });

    group.finish();
}

fn bench_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("translators");
    group.throughput(Throughput::Elements(1));

    let np = network_policy();
    group.bench_function("network_policy_to_policy", |b| {
        b.iter(|| {
            let _ = network_policy_to_policy(black_box(&np));
        });
    });

    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some("default".to_string()),
            labels: Some(labels(8)),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    group.bench_function("namespace_to_profile", |b| {
        b.iter(|| {
            let _ = namespace_to_profile(black_box(&ns));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_workload_endpoints, bench_policies);
criterion_main!(benches);
