// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use social_reform::models::SocialPlatform;
use social_reform::services::identity::derive_username;
use social_reform::services::providers::normalize;
use std::hint::black_box;

/// Representative profile payloads, shaped the way each provider returns them.
fn payloads() -> Vec<(SocialPlatform, Value)> {
    vec![
        (
            SocialPlatform::Facebook,
            json!({
                "id": "10158392019283",
                "email": "pat.doe@example.com",
                "name": "Pat Doe",
                "picture": { "data": { "url": "https://cdn.example.com/pat.jpg", "is_silhouette": false } },
            }),
        ),
        (
            SocialPlatform::Google,
            json!({
                "id": "110248495921238986420",
                "email": "pat@example.com",
                "verified_email": true,
                "name": "Pat Doe",
                "picture": "https://lh3.example.com/a/pat",
            }),
        ),
        (
            SocialPlatform::Twitter,
            json!({
                "data": {
                    "id": "2244994945",
                    "name": "Pat Doe",
                    "username": "pat_doe",
                    "profile_image_url": "https://pbs.example.com/pat.jpg",
                },
            }),
        ),
        (
            SocialPlatform::Twitch,
            json!({
                "data": [{
                    "id": "141981764",
                    "login": "patdoe",
                    "display_name": "PatDoe",
                    "email": "pat@example.com",
                    "profile_image_url": "https://twitch.example.com/p.png",
                }],
            }),
        ),
    ]
}

fn benchmark_normalize(c: &mut Criterion) {
    let payloads = payloads();
    let mut group = c.benchmark_group("normalize");

    for (platform, raw) in &payloads {
        group.bench_function(platform.as_str(), |b| {
            b.iter(|| normalize(black_box(*platform), black_box(raw)))
        });
    }

    group.finish();
}

fn benchmark_derive_username(c: &mut Criterion) {
    let identities: Vec<_> = payloads()
        .iter()
        .filter_map(|(platform, raw)| normalize(*platform, raw).ok())
        .collect();

    c.bench_function("derive_username", |b| {
        b.iter(|| {
            for identity in &identities {
                black_box(derive_username(black_box(identity)));
            }
        })
    });
}

criterion_group!(benches, benchmark_normalize, benchmark_derive_username);
criterion_main!(benches);
