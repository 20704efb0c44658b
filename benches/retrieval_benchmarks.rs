use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::runtime::Runtime;

use jobmatch::compose::job_text;
use jobmatch::feedback::precision_at_k;
use jobmatch::index::{self, IndexEntry, JobMetadata};
use jobmatch::{
    Area, FeedbackRecord, HashingEmbedder, JobRecord, MemoryIndex, Rating, SearchFilters,
    Seniority, VectorIndex,
};

const DIM: usize = 384;

fn random_vector(rng: &mut StdRng) -> Vec<f32> {
    (0..DIM).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn build_index(rt: &Runtime, size: usize) -> MemoryIndex {
    let mut rng = StdRng::seed_from_u64(42);
    let entries = (0..size as i64)
        .map(|id| {
            let area = Area::ALL[id as usize % Area::ALL.len()];
            IndexEntry {
                id: format!("job_{}", id),
                vector: random_vector(&mut rng),
                metadata: JobMetadata {
                    job_id: id,
                    title: format!("Job {}", id),
                    company: "Acme".into(),
                    area: area.as_str().into(),
                    seniority: Seniority::Mid.as_str().into(),
                    location: if id % 3 == 0 { "São Paulo" } else { "Remoto" }.into(),
                },
                document: String::new(),
            }
        })
        .collect();
    let index = MemoryIndex::new();
    rt.block_on(index.upsert(entries)).unwrap();
    index
}

fn bench_search(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("memory_index_search");

    for size in [1_000, 10_000].iter() {
        let index = build_index(&rt, *size);
        let query = random_vector(&mut StdRng::seed_from_u64(7));
        let filters = SearchFilters {
            area: Some(Area::Dados),
            location: Some("Paulo".into()),
            ..Default::default()
        };

        group.bench_with_input(BenchmarkId::new("unfiltered", size), size, |b, _| {
            b.to_async(&rt).iter(|| async {
                index::search(&index, black_box(&query), 10, &SearchFilters::default())
                    .await
                    .unwrap()
            });
        });
        group.bench_with_input(BenchmarkId::new("filtered", size), size, |b, _| {
            b.to_async(&rt).iter(|| async {
                index::search(&index, black_box(&query), 10, &filters)
                    .await
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_compose_and_embed(c: &mut Criterion) {
    let job = JobRecord {
        id: 1,
        external_id: None,
        title: "Engenheiro de Dados Sênior".into(),
        company: "Acme".into(),
        location: Some("São Paulo, SP".into()),
        description: "Pipelines de dados com Spark, Airflow e SQL. ".repeat(40),
        requirements: Some("Experiência com Python e nuvem. ".repeat(30)),
        seniority: Seniority::Senior,
        area: Area::Dados,
        skills: vec!["python".into(), "spark".into(), "sql".into()],
        salary_min: None,
        salary_max: None,
        url: None,
        embedding_id: None,
        created_at_ms: 0,
    };
    let embedder = HashingEmbedder::new(DIM).unwrap();

    c.bench_function("compose_job_text", |b| b.iter(|| job_text(black_box(&job))));
    let text = job_text(&job);
    c.bench_function("hashing_embed", |b| {
        b.iter(|| embedder.embed_sync(black_box(&text)))
    });
}

fn bench_precision(c: &mut Criterion) {
    let records: Vec<FeedbackRecord> = (0..1_000)
        .map(|i| FeedbackRecord {
            id: i,
            profile_id: 1,
            job_id: i,
            rating: if i % 3 == 0 {
                Rating::Irrelevant
            } else {
                Rating::Relevant
            },
            rank_position: Some((i % 50) as u32 + 1),
            similarity_score: None,
            created_at_ms: 0,
        })
        .collect();

    c.bench_function("precision_at_10", |b| {
        b.iter(|| precision_at_k(black_box(&records), 10))
    });
}

criterion_group!(benches, bench_search, bench_compose_and_embed, bench_precision);
criterion_main!(benches);
