use criterion::{criterion_group, criterion_main, Criterion};
use rasterhtml::{Canvas, DrawCall, Rasterizer, RenderOptions};

const PAGE: &str = r#"<html><head><title>Bench</title>
<style>a:hover { color: red } p { margin: 0 }</style></head>
<body><h1>Hello&nbsp;bench</h1><p>one<br>two</p><a class="link">l</a>
<img src="data:image/png;base64,AQID"><input name="q" value="v"></body></html>"#;

fn bench_draw_html(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");
    let rasterizer = Rasterizer::with_default_backends().expect("failed to create rasterizer");

    c.bench_function("draw_html", |b| {
        b.iter(|| {
            let call = DrawCall::new().canvas(Canvas::new(320, 240));
            runtime.block_on(rasterizer.draw_html(PAGE, call)).unwrap();
        })
    });

    c.bench_function("draw_html_forced_hover", |b| {
        b.iter(|| {
            let opts = RenderOptions {
                hover: Some(".link".into()),
                zoom: Some(2.0),
                ..Default::default()
            };
            runtime
                .block_on(rasterizer.draw_html(PAGE, DrawCall::new().options(opts)))
                .unwrap();
        })
    });
}

fn bench_draw_html_with_scripts(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");
    let rasterizer = Rasterizer::with_default_backends().expect("failed to create rasterizer");
    let page = concat!(
        "<html><body><p>x</p>",
        "<script>let s = 0; for (let i = 0; i < 100; i++) { s += i; }</script>",
        "</body></html>"
    );

    c.bench_function("draw_html_execute_js", |b| {
        b.iter(|| {
            let opts = RenderOptions::default().with_execute_js(Some(1000));
            runtime
                .block_on(rasterizer.draw_html(page, DrawCall::new().options(opts)))
                .unwrap();
        })
    });
}

criterion_group!(benches, bench_draw_html, bench_draw_html_with_scripts);
criterion_main!(benches);
