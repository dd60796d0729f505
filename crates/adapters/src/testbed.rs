// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Test-bed capture from the local machine.

use lance_bench_benchmarks::TestBed;
use sysinfo::System;
use tracing::debug;

/// Describe the machine this process runs on.
///
/// `name` overrides the host name as the test-bed name.
pub fn capture_test_bed(name: Option<&str>) -> TestBed {
    let mut system = System::new();
    system.refresh_cpu_all();
    system.refresh_memory();

    let cpu = system
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| std::env::consts::ARCH.to_string());
    let os = System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string());
    let name = name
        .map(str::to_string)
        .or_else(System::host_name)
        .unwrap_or_else(|| "unknown".to_string());

    let bed = TestBed {
        name,
        cpu,
        memory_bytes: system.total_memory(),
        os,
    };
    debug!(name = %bed.name, cpu = %bed.cpu, memory_bytes = bed.memory_bytes, os = %bed.os, "captured test bed");
    bed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_name_is_used() {
        let bed = capture_test_bed(Some("gcp-c3-standard-8"));
        assert_eq!(bed.name, "gcp-c3-standard-8");
        assert!(!bed.cpu.is_empty());
        assert!(!bed.os.is_empty());
    }

    #[test]
    fn default_name_is_not_empty() {
        assert!(!capture_test_bed(None).name.is_empty());
    }
}
