use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tl_core::Image;
use tl_tree::{ExtractorParameters, extract_component_tree};

fn synthetic_blobs(width: usize, height: usize) -> Image<f32> {
    let mut data = Vec::with_capacity(width * height);

    for y in 0..height {
        for x in 0..width {
            // overlapping smooth bumps give a deep, branchy component tree
            let fx = x as f32 / width as f32;
            let fy = y as f32 / height as f32;
            let v = (fx * 37.0).sin() * (fy * 29.0).cos() + (fx * 5.0 + fy * 3.0).sin();
            data.push(v);
        }
    }

    Image::from_vec(width, height, data).expect("valid image")
}

fn bench_extract_tree(c: &mut Criterion) {
    let image = synthetic_blobs(512, 512);
    let parameters = ExtractorParameters {
        min_size: 16,
        ..ExtractorParameters::default()
    };

    c.bench_function("tl_tree_extract_512", |b| {
        b.iter(|| {
            let tree = extract_component_tree::<u8>(black_box(&image), black_box(&parameters))
                .expect("extraction succeeds");
            black_box(tree.count());
        });
    });
}

criterion_group!(benches, bench_extract_tree);
criterion_main!(benches);
