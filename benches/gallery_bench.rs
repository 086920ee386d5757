use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nu_plugin_gallery::algo::catalog::Catalog;
use nu_plugin_gallery::algo::matcher::FolderMatcher;
use nu_plugin_gallery::algo::rewrite::{PageRewriter, RewriteTarget};
use nu_plugin_gallery::config::GalleryConfig;

/// Synthetic folder names shaped like a print shop's product catalog.
fn folder_names(n: usize) -> Vec<String> {
    let products = [
        "business-card",
        "poster-a1",
        "calendar-wall",
        "mug",
        "tshirt",
        "flyer-a5",
        "roll-up-banner",
        "sticker-vinyl",
        "notepad",
        "letterhead",
    ];
    (0..n)
        .map(|i| format!("{}-{i}", products[i % products.len()]))
        .collect()
}

fn page_html(thumbnails: usize) -> String {
    let thumbs: String = (0..thumbnails)
        .map(|i| format!("<img src=\"old{i}.png\" class=\"thumbnail-image\">"))
        .collect();
    format!(
        "<!DOCTYPE html><html><head><title>Mugs</title></head><body>\
         <div class=\"main-product-image\"><img id=\"mainImage\" src=\"/placeholder.svg\" alt=\"Mug\">\
         <div class=\"thumbnail-gallery\">{thumbs}</div></div>\
         <script>function preloadImage(s) {{}} preloadImage('/placeholder.svg');</script>\
         </body></html>"
    )
}

fn bench_match(c: &mut Criterion) {
    let config = GalleryConfig::builtin();
    let matcher = FolderMatcher::new(config.stop_word_set(), &config.matching, &config.overrides);
    let mut group = c.benchmark_group("best_match");
    for size in [50, 500] {
        let catalog = Catalog::from_folders(folder_names(size).into_iter().map(|f| (f, vec!["a.png"])));
        group.bench_with_input(BenchmarkId::from_parameter(size), &catalog, |b, catalog| {
            b.iter(|| {
                matcher.best_match(
                    black_box("custom-poster-printing-near-me.html"),
                    catalog.folder_names(),
                )
            })
        });
    }
    group.finish();
}

fn bench_rewrite(c: &mut Criterion) {
    let rewriter = PageRewriter::new(&GalleryConfig::builtin().markup).unwrap();
    let target = RewriteTarget::new(
        (1..=6)
            .map(|i| format!("assets/images/products/All-Products/mug/{i}.png"))
            .collect(),
    );
    let html = page_html(6);
    c.bench_function("rewrite/page", |b| {
        b.iter(|| rewriter.rewrite(black_box(&html), &target).unwrap())
    });
}

criterion_group!(benches, bench_match, bench_rewrite);
criterion_main!(benches);
