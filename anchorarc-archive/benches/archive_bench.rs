//! Benchmarks for writing and parsing containers in memory.

use anchorarc_archive::{ArchiveReader, ArchiveWriter, MemoryContentSource, assign_offsets};
use anchorarc_core::{Node, Tree};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::io::Cursor;

/// A tree of `dirs` directories holding `files` files of `size` bytes each.
fn make_tree(dirs: usize, files: usize, size: usize) -> (Tree, MemoryContentSource) {
    let mut content = MemoryContentSource::new();
    let mut roots = Vec::with_capacity(dirs);
    for d in 0..dirs {
        let dir_name = format!("dir{d:04}");
        let mut dir = Node::directory(dir_name.as_str(), dir_name.as_str()).unwrap();
        for f in 0..files {
            let name = format!("file{f:04}.dat");
            let path = format!("{dir_name}/{name}");
            let data: Vec<u8> = (0..size).map(|i| (i * 31 + f) as u8).collect();
            content.insert(path.as_str(), data);
            dir.push_child(Node::file(name, path, size as u64).unwrap())
                .unwrap();
        }
        roots.push(dir);
    }
    (Tree::from_roots(roots), content)
}

fn write_container(tree: &Tree, content: &mut MemoryContentSource) -> Vec<u8> {
    let mut writer = ArchiveWriter::new(Vec::new()).with_buffer_size(64 * 1024);
    writer.write_archive(tree, content).unwrap();
    writer.into_inner()
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    for &(dirs, files) in &[(10, 10), (100, 100)] {
        let (tree, _) = make_tree(dirs, files, 0);
        group.throughput(Throughput::Elements((dirs * (files + 1)) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{dirs}x{files}")),
            &tree,
            |b, tree| {
                b.iter(|| {
                    let mut tree = tree.clone();
                    black_box(assign_offsets(&mut tree).unwrap())
                })
            },
        );
    }
    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");
    for &size in &[64usize, 4096, 65536] {
        let (mut tree, mut content) = make_tree(10, 20, size);
        assign_offsets(&mut tree).unwrap();
        group.throughput(Throughput::Bytes((10 * 20 * size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(write_container(&tree, &mut content)))
        });
    }
    group.finish();
}

fn bench_read_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_tree");
    for &(dirs, files) in &[(10, 10), (100, 100)] {
        let (mut tree, mut content) = make_tree(dirs, files, 16);
        assign_offsets(&mut tree).unwrap();
        let bytes = write_container(&tree, &mut content);
        group.throughput(Throughput::Elements((dirs * (files + 1)) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{dirs}x{files}")),
            &bytes,
            |b, bytes| {
                b.iter(|| {
                    let mut reader = ArchiveReader::new(Cursor::new(bytes.as_slice())).unwrap();
                    black_box(reader.read_tree().unwrap())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_layout, bench_write, bench_read_tree);
criterion_main!(benches);
