use super::AppState;
use crate::error::LobbyError;
use crate::types::*;
use std::cmp::Ordering;

/// Aggregate scores for every chocolate up to the current one.
///
/// Averages divide by the number of votes actually present. Items nobody
/// voted on have no average and sort after all items that do.
pub fn compute_results(lobby: &Lobby) -> Vec<ItemResult> {
    let last = lobby.current_chocolate.min(LAST_ITEM);

    let mut results: Vec<ItemResult> = (0..=last)
        .map(|item| {
            let mut voters: Vec<VoterScore> = lobby
                .votes
                .get(&item)
                .map(|votes| {
                    votes
                        .iter()
                        .map(|(voter, score)| VoterScore {
                            voter: voter.clone(),
                            score: *score,
                        })
                        .collect()
                })
                .unwrap_or_default();

            // Highest score first, then by name for a stable listing
            voters.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.voter.cmp(&b.voter)));

            let average = if voters.is_empty() {
                None
            } else {
                let total: u32 = voters.iter().map(|v| v.score as u32).sum();
                Some(total as f64 / voters.len() as f64)
            };

            ItemResult {
                item,
                average,
                voters,
            }
        })
        .collect();

    results.sort_by(|a, b| match (a.average, b.average) {
        (Some(x), Some(y)) => y
            .partial_cmp(&x)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.item.cmp(&b.item)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.item.cmp(&b.item),
    });
    results
}

impl AppState {
    pub async fn get_results(&self, code: &str) -> Result<Vec<ItemResult>, LobbyError> {
        let lobby = self.get_lobby(code).await?;
        Ok(compute_results(&lobby))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby_with_votes(current: ItemIndex, votes: &[(ItemIndex, &str, Score)]) -> Lobby {
        let mut lobby = Lobby::new("AB12CD".to_string(), "Ayşe".to_string());
        lobby.status = LobbyStatus::Finished;
        lobby.current_chocolate = current;
        for (item, voter, score) in votes {
            lobby.participants.insert(voter.to_string(), true);
            lobby
                .votes
                .entry(*item)
                .or_default()
                .insert(voter.to_string(), *score);
        }
        lobby
    }

    #[test]
    fn test_mean_of_two_votes() {
        let lobby = lobby_with_votes(0, &[(0, "Ayşe", 4), (0, "Mehmet", 5)]);
        let results = compute_results(&lobby);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].average, Some(4.5));
        assert_eq!(results[0].voters[0].voter, "Mehmet");
        assert_eq!(results[0].voters[1].voter, "Ayşe");
    }

    #[test]
    fn test_sorted_by_mean_then_voters_by_score() {
        let lobby = lobby_with_votes(
            2,
            &[
                (0, "a", 2),
                (0, "b", 3),
                (1, "a", 5),
                (1, "b", 4),
                (2, "a", 1),
                (2, "b", 5),
            ],
        );
        let results = compute_results(&lobby);

        let order: Vec<ItemIndex> = results.iter().map(|r| r.item).collect();
        assert_eq!(order, vec![1, 0, 2]);
        for pair in results.windows(2) {
            assert!(pair[0].average >= pair[1].average);
        }
        for result in &results {
            for pair in result.voters.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        }
    }

    #[test]
    fn test_divisor_counts_votes_not_participants() {
        let mut lobby = lobby_with_votes(0, &[(0, "a", 3)]);
        lobby.participants.insert("late".to_string(), true);

        let results = compute_results(&lobby);
        assert_eq!(results[0].average, Some(3.0));
    }

    #[test]
    fn test_item_without_votes_has_no_average_and_sorts_last() {
        let lobby = lobby_with_votes(2, &[(0, "a", 1), (2, "a", 2)]);
        let results = compute_results(&lobby);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].item, 2);
        assert_eq!(results[1].item, 0);
        assert_eq!(results[2].item, 1);
        assert_eq!(results[2].average, None);
        assert!(results[2].voters.is_empty());
    }

    #[test]
    fn test_no_data_serializes_as_null() {
        let lobby = lobby_with_votes(0, &[]);
        let json = serde_json::to_value(compute_results(&lobby)).unwrap();
        assert!(json[0]["average"].is_null());
    }
}
