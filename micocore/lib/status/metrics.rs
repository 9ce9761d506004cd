use std::collections::BTreeMap;

use crate::{
    models::{NodeMetrics, PodInformation, PodMetrics},
    orchestration::PodFacts,
};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Groups pods by their host node and averages CPU load and memory usage per node. The result is
/// sorted by node name.
pub fn aggregate_node_metrics(pods: &[PodInformation]) -> Vec<NodeMetrics> {
    let mut nodes: BTreeMap<&str, (f64, f64, usize)> = BTreeMap::new();
    for pod in pods {
        let (cpu, memory, count) = nodes.entry(pod.host_node.as_str()).or_default();
        *cpu += pod.metrics.cpu_load;
        *memory += pod.metrics.memory_usage;
        *count += 1;
    }

    nodes
        .into_iter()
        .map(|(node_name, (cpu, memory, count))| NodeMetrics {
            node_name: node_name.to_string(),
            average_cpu_load: cpu / count as f64,
            average_memory_usage: memory / count as f64,
        })
        .collect()
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<PodFacts> for PodInformation {
    fn from(facts: PodFacts) -> Self {
        Self {
            pod_name: facts.pod_name,
            host_node: facts.host_node,
            phase: facts.phase,
            metrics: PodMetrics {
                cpu_load: facts.cpu_load,
                memory_usage: facts.memory_usage,
            },
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PodPhase;

    fn pod(name: &str, node: &str, cpu: f64, memory: f64) -> PodInformation {
        PodFacts {
            pod_name: name.to_string(),
            host_node: node.to_string(),
            phase: PodPhase::Running,
            cpu_load: cpu,
            memory_usage: memory,
        }
        .into()
    }

    #[test]
    fn test_metrics_are_averaged_per_node() {
        let pods = vec![
            pod("p1", "n2", 30.0, 10.0),
            pod("p2", "n1", 10.0, 50.0),
            pod("p3", "n1", 40.0, 70.0),
        ];

        let metrics = aggregate_node_metrics(&pods);

        assert_eq!(
            metrics,
            vec![
                NodeMetrics {
                    node_name: "n1".to_string(),
                    average_cpu_load: 25.0,
                    average_memory_usage: 60.0,
                },
                NodeMetrics {
                    node_name: "n2".to_string(),
                    average_cpu_load: 30.0,
                    average_memory_usage: 10.0,
                },
            ]
        );
    }

    #[test]
    fn test_no_pods_no_metrics() {
        assert!(aggregate_node_metrics(&[]).is_empty());
    }
}
