//! Chapter-level rollup of per-scene ranks.

use serde::{Deserialize, Serialize};

use crate::story::Scene;

/// An entity's standing within one chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterEntityRank {
    pub name: String,
    /// Mean of the entity's per-scene ranks, `None` if no scene carried one.
    pub mean_rank: Option<f64>,
    /// 1 = best (lowest mean rank).
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRanking {
    pub chapter: String,
    /// Entities in order of first appearance within the chapter.
    pub entities: Vec<ChapterEntityRank>,
}

/// Average each entity's per-scene rank under `axis` within every chapter and
/// rank the averages ascending.
///
/// Scenes without a `chapter` field are skipped. Chapters come out in order of
/// first appearance. Entities without any rank sort last; ties keep first
/// appearance order.
pub fn chapter_rollup(scenes: &[Scene], axis: &str) -> Vec<ChapterRanking> {
    // (chapter, [(name, sum, count)])
    let mut chapters: Vec<(String, Vec<(String, f64, usize)>)> = Vec::new();

    for scene in scenes {
        let Some(chapter) = scene.chapter() else {
            continue;
        };
        let slot = match chapters.iter().position(|(c, _)| c == chapter) {
            Some(i) => i,
            None => {
                chapters.push((chapter.to_string(), Vec::new()));
                chapters.len() - 1
            }
        };
        let tallies = &mut chapters[slot].1;

        for entity in &scene.characters {
            let idx = match tallies.iter().position(|(n, _, _)| *n == entity.name) {
                Some(i) => i,
                None => {
                    tallies.push((entity.name.clone(), 0.0, 0));
                    tallies.len() - 1
                }
            };
            if let Some(rank) = entity.axis_value(axis) {
                tallies[idx].1 += rank;
                tallies[idx].2 += 1;
            }
        }
    }

    chapters
        .into_iter()
        .map(|(chapter, tallies)| {
            let means: Vec<(String, Option<f64>)> = tallies
                .into_iter()
                .map(|(name, sum, count)| (name, (count > 0).then(|| sum / count as f64)))
                .collect();

            let mut order: Vec<usize> = (0..means.len()).collect();
            order.sort_by(|&a, &b| match (means[a].1, means[b].1) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
            let mut ranks = vec![0; means.len()];
            for (position, index) in order.into_iter().enumerate() {
                ranks[index] = position + 1;
            }

            let entities = means
                .into_iter()
                .zip(ranks)
                .map(|((name, mean_rank), rank)| ChapterEntityRank {
                    name,
                    mean_rank,
                    rank,
                })
                .collect();
            ChapterRanking { chapter, entities }
        })
        .collect()
}
