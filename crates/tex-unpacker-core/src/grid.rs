use image::{RgbaImage, imageops};

use crate::error::{Result, TexUnpackerError};

/// Splits `img` into `rows x cols` equal tiles, row-major. Tile size is the
/// integer quotient of the image size; leftover pixels on the right and
/// bottom edges are dropped.
pub fn split_grid(img: &RgbaImage, rows: u32, cols: u32) -> Result<Vec<RgbaImage>> {
    if rows == 0 || cols == 0 {
        return Err(TexUnpackerError::InvalidConfig(format!(
            "grid needs at least one row and column, got {rows}x{cols}"
        )));
    }
    let tile_w = img.width() / cols;
    let tile_h = img.height() / rows;
    if tile_w == 0 || tile_h == 0 {
        return Err(TexUnpackerError::InvalidInput(format!(
            "{}x{} image is too small for a {rows}x{cols} grid",
            img.width(),
            img.height()
        )));
    }
    let mut tiles = Vec::with_capacity((rows * cols) as usize);
    for i in 0..rows * cols {
        let x = (i % cols) * tile_w;
        let y = (i / cols) * tile_h;
        tiles.push(imageops::crop_imm(img, x, y, tile_w, tile_h).to_image());
    }
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn tiles_are_row_major() {
        let img = RgbaImage::from_fn(7, 4, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let tiles = split_grid(&img, 2, 3).unwrap();
        assert_eq!(tiles.len(), 6);
        for t in &tiles {
            assert_eq!(t.dimensions(), (2, 2));
        }
        // tile 4 = row 1, col 1 -> origin (2, 2)
        assert_eq!(tiles[4].get_pixel(0, 0), &Rgba([2, 2, 0, 255]));
        assert_eq!(tiles[5].get_pixel(1, 1), &Rgba([5, 3, 0, 255]));
    }

    #[test]
    fn zero_rows_is_invalid() {
        let img = RgbaImage::new(4, 4);
        assert!(matches!(
            split_grid(&img, 0, 1),
            Err(TexUnpackerError::InvalidConfig(_))
        ));
        assert!(matches!(
            split_grid(&img, 1, 5),
            Err(TexUnpackerError::InvalidInput(_))
        ));
    }
}
