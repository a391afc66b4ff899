mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tinyscript::{bytecode, vm};

fn bench_vm(c: &mut Criterion) {
    for (name, path) in common::WORKLOADS {
        let program = common::load_program(path);

        c.bench_function(&format!("vm_compile_only_{name}"), |b| {
            b.iter(|| {
                let compiled = bytecode::compile(black_box(&program)).expect("compile");
                black_box(compiled);
            })
        });

        c.bench_function(&format!("vm_execute_prepared_{name}"), |b| {
            let compiled = bytecode::compile(&program).expect("compile");
            let mut vm = vm::Vm::new();
            b.iter(|| {
                vm.run(black_box(&compiled)).expect("run");
                black_box(vm.output().len());
            })
        });

        c.bench_function(&format!("vm_total_{name}"), |b| {
            let mut vm = vm::Vm::new();
            b.iter(|| {
                let compiled = bytecode::compile(black_box(&program)).expect("compile");
                vm.run(&compiled).expect("run");
                black_box(vm.output().len());
            })
        });
    }
}

criterion_group!(benches, bench_vm);
criterion_main!(benches);
