use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use serde_json::json;
use sigbind::caster::TypeTag;
use sigbind::query::{decode, merge, QueryMap};
use sigbind::typed::{callable, reply, CallError};
use sigbind::{ApiRequest, Endpoint, EndpointOptions, ParameterSpec, SchemaRegistry};
use std::hint::black_box;
use std::sync::Arc;

const QUERY: &str = "filter[date][from]=2024-01-01&filter[date][to]=2024-02-01\
&filter[status]=open&tag=a&tag=b&tag=c&page=2&size=50&q=hello+world";

fn bench_decode(c: &mut Criterion) {
    let map = QueryMap::parse(QUERY);
    c.bench_function("query_parse", |b| b.iter(|| black_box(QueryMap::parse(black_box(QUERY)))));
    c.bench_function("query_decode", |b| b.iter(|| black_box(decode(black_box(&map)))));

    let body = json!({"filter": {"date": {"to": "2024-03-01"}}, "size": 10});
    let body = body.as_object().cloned().unwrap_or_default();
    c.bench_function("query_merge_body", |b| {
        b.iter(|| {
            let mut data = decode(&map);
            merge(body.clone(), &mut data);
            black_box(data)
        })
    });
}

fn bench_schema_load(c: &mut Criterion) {
    let registry = SchemaRegistry::new();
    let params = vec![
        ParameterSpec::required("q", TypeTag::Text),
        ParameterSpec::optional("page", TypeTag::Int, 0),
        ParameterSpec::optional("size", TypeTag::Int, 20),
        ParameterSpec::required("tag", TypeTag::Sequence),
        ParameterSpec::optional("filter", TypeTag::Mapping, json!({})),
    ];
    let schema = registry
        .build_schema("search", params.clone())
        .unwrap_or_else(|e| panic!("schema: {e}"));
    let data = decode(&QueryMap::parse(QUERY));
    c.bench_function("schema_load", |b| b.iter(|| black_box(schema.load(black_box(&data)))));

    let search = callable("search", params, |mut args| {
        let q: String = args.take("q")?;
        let page: i64 = args.take("page")?;
        reply::<_, CallError>(Ok(json!({"q": q, "page": page})))
    });
    let endpoint = Endpoint::new(Arc::new(search), EndpointOptions::new(), &registry)
        .unwrap_or_else(|e| panic!("endpoint: {e}"));
    let request = Arc::new(ApiRequest::new(Method::GET, &format!("/api/app/search/?{QUERY}")));
    c.bench_function("endpoint_dispatch", |b| b.iter(|| black_box(endpoint.respond(&request))));
}

criterion_group!(benches, bench_decode, bench_schema_load);
criterion_main!(benches);
