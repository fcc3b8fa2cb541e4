use crate::catalog::{Catalog, CatalogError, Category};
use crate::util::normalize;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Titles drawn per game: 25 grid cells plus 1 starting article.
pub const SET_SIZE: usize = 26;

/// Capped passes over the (reshuffled) category list before group caps are
/// abandoned. Keeps generation terminating on pathological catalogs.
const MAX_PASSES: usize = 8;

/// One game's worth of drawn titles.
#[derive(Debug, Clone)]
pub struct BingoSet {
    /// Exactly [`SET_SIZE`] titles, distinct under normalization. The first
    /// 25 populate the grid; the last is the starting article.
    pub titles: Vec<String>,
    /// Distinct unused titles, shuffled; the session draws substitutes from
    /// here when an article's content is unavailable.
    pub reserve: Vec<String>,
    /// True when group caps had to be ignored to fill the set.
    pub relaxed: bool,
}

/// Draws a bingo set from the catalog.
///
/// Categories are uniformly shuffled and visited in order; a category is
/// skipped while its group is at its cap, otherwise it contributes one
/// random article not already selected (normalized-title uniqueness). Up to
/// [`MAX_PASSES`] passes run under the caps; a still-short set triggers the
/// documented constraint-exhaustion fallback where caps are ignored. Only a
/// catalog that cannot supply [`SET_SIZE`] distinct titles at all fails.
pub fn draw(catalog: &Catalog, rng: &mut impl Rng) -> Result<BingoSet, CatalogError> {
    if catalog.is_empty() {
        return Err(CatalogError::Empty);
    }

    let mut selected: Vec<String> = Vec::with_capacity(SET_SIZE);
    let mut seen: HashSet<String> = HashSet::with_capacity(SET_SIZE);
    let mut group_counts: HashMap<&str, usize> = HashMap::new();

    let mut categories: Vec<&Category> = catalog
        .categories
        .iter()
        .filter(|c| !c.articles.is_empty())
        .collect();
    categories.shuffle(rng);

    'passes: for _ in 0..MAX_PASSES {
        for category in &categories {
            if selected.len() == SET_SIZE {
                break 'passes;
            }
            if let Some(group) = category.group.as_deref() {
                let cap = catalog.group_caps.get(group).copied().unwrap_or(usize::MAX);
                if group_counts.get(group).copied().unwrap_or(0) >= cap {
                    continue;
                }
            }
            let Some(title) = pick_unseen(category, &seen, rng) else {
                continue;
            };
            seen.insert(normalize(&title));
            selected.push(title);
            if let Some(group) = category.group.as_deref() {
                *group_counts.entry(group).or_insert(0) += 1;
            }
        }
        if selected.len() == SET_SIZE {
            break;
        }
        // Revisit in a fresh order so the same caps don't block the same tail
        categories.shuffle(rng);
    }

    let mut relaxed = false;
    if selected.len() < SET_SIZE {
        // Constraint exhaustion: ignore group caps rather than hang
        relaxed = true;
        tracing::warn!(
            selected = selected.len(),
            needed = SET_SIZE,
            "Group constraints exhausted, relaxing caps to fill the set"
        );
        let mut remaining: Vec<&String> = catalog
            .categories
            .iter()
            .flat_map(|c| c.articles.iter())
            .collect();
        remaining.shuffle(rng);
        for title in remaining {
            if selected.len() == SET_SIZE {
                break;
            }
            let key = normalize(title);
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.insert(key);
            selected.push(title.clone());
        }
    }

    if selected.len() < SET_SIZE {
        return Err(CatalogError::Insufficient {
            needed: SET_SIZE,
            available: selected.len(),
        });
    }

    // Everything distinct and unused becomes the substitution reserve
    let mut reserve: Vec<String> = Vec::new();
    let mut reserve_seen = seen;
    for category in &catalog.categories {
        for title in &category.articles {
            let key = normalize(title);
            if !key.is_empty() && reserve_seen.insert(key) {
                reserve.push(title.clone());
            }
        }
    }
    reserve.shuffle(rng);

    Ok(BingoSet {
        titles: selected,
        reserve,
        relaxed,
    })
}

fn pick_unseen(category: &Category, seen: &HashSet<String>, rng: &mut impl Rng) -> Option<String> {
    let candidates: Vec<&String> = category
        .articles
        .iter()
        .filter(|title| {
            let key = normalize(title);
            !key.is_empty() && !seen.contains(&key)
        })
        .collect();
    candidates.choose(rng).map(|title| (*title).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog_of(titles: &[&str]) -> Catalog {
        let categories = titles
            .iter()
            .map(|t| Category {
                name: t.to_string(),
                articles: vec![t.to_string()],
                group: None,
            })
            .collect();
        Catalog::new(categories, HashMap::new())
    }

    fn numbered_titles(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("Article {i}")).collect()
    }

    #[test]
    fn test_draws_distinct_normalized_titles() {
        let titles = numbered_titles(40);
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let set = draw(&catalog_of(&refs), &mut rng).unwrap();
        assert_eq!(set.titles.len(), SET_SIZE);
        assert!(!set.relaxed);

        let keys: HashSet<String> = set.titles.iter().map(|t| normalize(t)).collect();
        assert_eq!(keys.len(), SET_SIZE);
    }

    #[test]
    fn test_reserve_holds_unused_titles_only() {
        let titles = numbered_titles(40);
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let set = draw(&catalog_of(&refs), &mut rng).unwrap();
        assert_eq!(set.reserve.len(), 40 - SET_SIZE);
        let selected: HashSet<String> = set.titles.iter().map(|t| normalize(t)).collect();
        for title in &set.reserve {
            assert!(!selected.contains(&normalize(title)));
        }
    }

    #[test]
    fn test_group_caps_respected_when_satisfiable() {
        // 10 "capped" categories limited to 2 per game, plus 30 free ones
        let mut categories: Vec<Category> = (0..10)
            .map(|i| Category {
                name: format!("Capped {i}"),
                articles: vec![format!("Capped Article {i}")],
                group: Some("capped".into()),
            })
            .collect();
        categories.extend((0..30).map(|i| Category {
            name: format!("Free {i}"),
            articles: vec![format!("Free Article {i}")],
            group: None,
        }));
        let catalog = Catalog::new(categories, HashMap::from([("capped".to_string(), 2)]));

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let set = draw(&catalog, &mut rng).unwrap();
            assert!(!set.relaxed);
            let capped = set
                .titles
                .iter()
                .filter(|t| t.starts_with("Capped"))
                .count();
            assert!(capped <= 2, "seed {seed}: {capped} capped titles selected");
        }
    }

    #[test]
    fn test_caps_relaxed_rather_than_hang() {
        // Only capped categories: caps allow 2 titles, but 30 exist. The
        // set can only be filled by ignoring the cap.
        let categories: Vec<Category> = (0..30)
            .map(|i| Category {
                name: format!("Capped {i}"),
                articles: vec![format!("Capped Article {i}")],
                group: Some("capped".into()),
            })
            .collect();
        let catalog = Catalog::new(categories, HashMap::from([("capped".to_string(), 2)]));

        let mut rng = StdRng::seed_from_u64(3);
        let set = draw(&catalog, &mut rng).unwrap();
        assert!(set.relaxed);
        assert_eq!(set.titles.len(), SET_SIZE);
    }

    #[test]
    fn test_insufficient_catalog_fails() {
        let titles = numbered_titles(10);
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let result = draw(&catalog_of(&refs), &mut rng);
        assert!(matches!(
            result,
            Err(CatalogError::Insufficient { needed: 26, .. })
        ));
    }

    #[test]
    fn test_empty_catalog_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = draw(&Catalog::default(), &mut rng);
        assert!(matches!(result, Err(CatalogError::Empty)));
    }

    #[test]
    fn test_duplicate_titles_across_categories_counted_once() {
        // 26 distinct titles but every category repeats "Physics"
        let mut categories: Vec<Category> = numbered_titles(26)
            .into_iter()
            .map(|t| Category {
                name: t.clone(),
                articles: vec![t, "Physics".to_string()],
                group: None,
            })
            .collect();
        categories.push(Category {
            name: "Science".into(),
            articles: vec!["physics".into()],
            group: None,
        });
        let catalog = Catalog::new(categories, HashMap::new());

        let mut rng = StdRng::seed_from_u64(11);
        let set = draw(&catalog, &mut rng).unwrap();
        let physics = set
            .titles
            .iter()
            .filter(|t| normalize(t) == "physics")
            .count();
        assert!(physics <= 1);
    }

    #[test]
    fn test_seeded_draw_is_deterministic() {
        let titles = numbered_titles(50);
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let catalog = catalog_of(&refs);

        let a = draw(&catalog, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = draw(&catalog, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a.titles, b.titles);
        assert_eq!(a.reserve, b.reserve);
    }
}
