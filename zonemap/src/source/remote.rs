//! Official tile service source.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use image::RgbaImage;

use super::{HttpClient, TileError, TileSource};

/// Number of DNS aliases the tile service publishes (`tiles1` .. `tiles4`).
const HOST_ALIAS_COUNT: usize = 4;

/// Concurrent fetches the service comfortably sustains across its aliases.
const REMOTE_PARALLELISM: usize = 32;

/// Tile source fetching from the official tile service at
/// `https://tiles{n}.guildwars2.com/{continent}/{floor}/{zoom}/{x}/{y}.jpg`.
///
/// Requests rotate across the `tiles1`..`tiles4` DNS aliases to spread
/// load, the same way browsers parallelize tile fetches for the wiki maps.
/// The service drops individual tiles now and then, so this source reports
/// `degrades_on_error`, letting the assembler substitute placeholders.
pub struct RemoteTileSource<C: HttpClient> {
    http_client: C,
    next_alias: AtomicUsize,
}

impl<C: HttpClient> RemoteTileSource<C> {
    pub fn new(http_client: C) -> Self {
        Self {
            http_client,
            next_alias: AtomicUsize::new(0),
        }
    }

    fn build_url(&self, continent: u32, floor: u32, zoom: u8, x: i64, y: i64) -> String {
        let alias = 1 + self.next_alias.fetch_add(1, Ordering::Relaxed) % HOST_ALIAS_COUNT;
        format!(
            "https://tiles{}.guildwars2.com/{}/{}/{}/{}/{}.jpg",
            alias, continent, floor, zoom, x, y
        )
    }
}

#[async_trait]
impl<C: HttpClient> TileSource for RemoteTileSource<C> {
    async fn fetch_tile(
        &self,
        continent: u32,
        floor: u32,
        zoom: u8,
        x: i64,
        y: i64,
    ) -> Result<RgbaImage, TileError> {
        let url = self.build_url(continent, floor, zoom, x, y);
        let bytes = self.http_client.get(&url).await?;
        let image =
            image::load_from_memory(&bytes).map_err(|e| TileError::Decode(url, e))?;
        Ok(image.to_rgba8())
    }

    fn max_parallelism(&self) -> usize {
        REMOTE_PARALLELISM
    }

    fn degrades_on_error(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::MockHttpClient;
    use super::*;

    #[test]
    fn test_urls_rotate_across_aliases() {
        let source = RemoteTileSource::new(MockHttpClient::with_body(vec![]));

        let urls: Vec<String> = (0..5).map(|i| source.build_url(1, 1, 3, i, 0)).collect();
        assert!(urls[0].starts_with("https://tiles1.guildwars2.com/1/1/3/0/0.jpg"));
        assert!(urls[1].starts_with("https://tiles2.guildwars2.com/"));
        assert!(urls[2].starts_with("https://tiles3.guildwars2.com/"));
        assert!(urls[3].starts_with("https://tiles4.guildwars2.com/"));
        // Fifth request wraps back around to the first alias.
        assert!(urls[4].starts_with("https://tiles1.guildwars2.com/"));
    }

    #[test]
    fn test_remote_source_degrades_and_parallelizes() {
        let source = RemoteTileSource::new(MockHttpClient::with_body(vec![]));
        assert!(source.degrades_on_error());
        assert!(source.max_parallelism() > 1);
    }

    #[tokio::test]
    async fn test_http_error_propagates_as_tile_error() {
        let source = RemoteTileSource::new(MockHttpClient::with_error("HTTP 500"));
        let result = source.fetch_tile(1, 1, 3, 0, 0).await;
        assert!(matches!(result, Err(TileError::Http { .. })));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_a_decode_error() {
        let source = RemoteTileSource::new(MockHttpClient::with_body(vec![0, 1, 2, 3]));
        let result = source.fetch_tile(1, 1, 3, 0, 0).await;
        assert!(matches!(result, Err(TileError::Decode(..))));
    }
}
