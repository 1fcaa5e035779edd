use glam::UVec2;

use crate::Error;

/// Owned, tightly packed 2D texel grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T> Image<T> {
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self, Error> {
        let expected = width.checked_mul(height).ok_or(Error::SizeMismatch {
            expected: usize::MAX,
            actual: data.len(),
        })?;
        if data.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn extent(&self) -> UVec2 {
        UVec2::new(self.width as u32, self.height as u32)
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn as_view(&self) -> ImageView<'_, T> {
        ImageView {
            width: self.width,
            height: self.height,
            stride: self.width,
            data: &self.data,
        }
    }

    pub fn as_view_mut(&mut self) -> ImageViewMut<'_, T> {
        ImageViewMut {
            width: self.width,
            height: self.height,
            stride: self.width,
            data: &mut self.data,
        }
    }

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "texel ({x}, {y}) outside {}x{} image",
            self.width,
            self.height
        );
        y * self.width + x
    }
}

impl<T: Copy> Image<T> {
    /// Panics when `width * height` overflows `usize`.
    pub fn new_fill(width: usize, height: usize, value: T) -> Self {
        let len = width.checked_mul(height).expect("image size overflow");
        Self {
            width,
            height,
            data: vec![value; len],
        }
    }

    /// Panics when `(x, y)` lies outside the image.
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    /// Panics when `(x, y)` lies outside the image.
    pub fn texel(&self, x: usize, y: usize) -> T {
        self.data[self.index(x, y)]
    }
}

/// Borrowed window into an image, e.g. the active viewport of a larger
/// scratch texture. `stride` counts texels between row starts.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, T> {
    width: usize,
    height: usize,
    stride: usize,
    data: &'a [T],
}

impl<'a, T> ImageView<'a, T> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn row(&self, y: usize) -> &'a [T] {
        assert!(y < self.height, "row {y} outside view of height {}", self.height);
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn subview(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageView<'a, T>, Error> {
        let window = Window::locate(self.width, self.height, self.stride, x, y, width, height)?;
        let data = self.data.get(window.start..).ok_or(Error::OutOfBounds)?;
        if data.len() < window.len {
            return Err(Error::OutOfBounds);
        }

        Ok(ImageView {
            width,
            height,
            stride: self.stride,
            data,
        })
    }

    pub fn is_contiguous(&self) -> bool {
        self.stride == self.width
    }

    /// The texels as one slice, when rows are packed back to back.
    pub fn as_contiguous_slice(&self) -> Option<&'a [T]> {
        if self.is_contiguous() {
            self.data.get(..self.width * self.height)
        } else {
            None
        }
    }
}

impl<T: Copy> ImageView<'_, T> {
    /// Panics when `(x, y)` lies outside the view.
    pub fn texel(&self, x: usize, y: usize) -> T {
        self.row(y)[x]
    }
}

#[derive(Debug)]
pub struct ImageViewMut<'a, T> {
    width: usize,
    height: usize,
    stride: usize,
    data: &'a mut [T],
}

impl<T> ImageViewMut<'_, T> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        assert!(y < self.height, "row {y} outside view of height {}", self.height);
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    pub fn subview_mut(
        &mut self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageViewMut<'_, T>, Error> {
        let window = Window::locate(self.width, self.height, self.stride, x, y, width, height)?;
        let data = self
            .data
            .get_mut(window.start..)
            .ok_or(Error::OutOfBounds)?;
        if data.len() < window.len {
            return Err(Error::OutOfBounds);
        }

        Ok(ImageViewMut {
            width,
            height,
            stride: self.stride,
            data,
        })
    }
}

impl<T: Copy> ImageViewMut<'_, T> {
    /// Copies `src` row by row. Both views must have the same dimensions.
    pub fn copy_from(&mut self, src: &ImageView<'_, T>) -> Result<(), Error> {
        if src.width() != self.width || src.height() != self.height {
            return Err(Error::SizeMismatch {
                expected: self.width * self.height,
                actual: src.width() * src.height(),
            });
        }
        for y in 0..self.height {
            self.row_mut(y).copy_from_slice(src.row(y));
        }
        Ok(())
    }
}

/// Offset and minimum backing length of a `width x height` window at
/// `(x, y)` of a parent with the given stride.
struct Window {
    start: usize,
    len: usize,
}

impl Window {
    fn locate(
        parent_w: usize,
        parent_h: usize,
        stride: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, Error> {
        let fits_x = x.checked_add(width).is_some_and(|end| end <= parent_w);
        let fits_y = y.checked_add(height).is_some_and(|end| end <= parent_h);
        if !(fits_x && fits_y) {
            return Err(Error::OutOfBounds);
        }

        let start = y
            .checked_mul(stride)
            .and_then(|v| v.checked_add(x))
            .ok_or(Error::OutOfBounds)?;
        let len = if width == 0 || height == 0 {
            0
        } else {
            (height - 1)
                .checked_mul(stride)
                .and_then(|v| v.checked_add(width))
                .ok_or(Error::OutOfBounds)?
        };

        Ok(Self { start, len })
    }
}

#[cfg(test)]
mod tests {
    use super::Image;
    use crate::Error;

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = Image::from_vec(3, 2, vec![0u8; 5]).unwrap_err();
        assert_eq!(
            err,
            Error::SizeMismatch {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn subview_of_padded_parent() {
        let img = Image::from_vec(
            4,
            3,
            vec![
                10u8, 11, 12, 13, //
                20, 21, 22, 23, //
                30, 31, 32, 33, //
            ],
        )
        .expect("valid image");
        let sub = img.as_view().subview(1, 1, 3, 2).expect("valid subview");

        assert_eq!((sub.width(), sub.height(), sub.stride()), (3, 2, 4));
        assert!(!sub.is_contiguous());
        assert_eq!(sub.as_contiguous_slice(), None);
        assert_eq!(sub.row(1), &[31, 32, 33]);
        assert_eq!(sub.texel(2, 1), 33);
        assert_eq!(img.as_view().as_contiguous_slice().map(<[u8]>::len), Some(12));
        assert_eq!(
            img.as_view().subview(2, 2, 3, 1).unwrap_err(),
            Error::OutOfBounds
        );
    }

    #[test]
    fn copy_into_window_leaves_rest_untouched() {
        let src = Image::from_vec(2, 2, vec![1u8, 2, 3, 4]).expect("valid image");
        let mut dst = Image::new_fill(4, 3, 0u8);
        dst.as_view_mut()
            .subview_mut(1, 1, 2, 2)
            .expect("valid window")
            .copy_from(&src.as_view())
            .expect("same size");

        assert_eq!(
            dst.data(),
            &[
                0, 0, 0, 0, //
                0, 1, 2, 0, //
                0, 3, 4, 0, //
            ]
        );
    }

    #[test]
    fn copy_rejects_size_mismatch() {
        let src = Image::new_fill(3, 3, 1u8);
        let mut dst = Image::new_fill(2, 2, 0u8);
        assert!(dst.as_view_mut().copy_from(&src.as_view()).is_err());
        assert!(dst.as_view_mut().subview_mut(1, 0, 2, 1).is_err());
    }

    #[test]
    #[should_panic(expected = "image size overflow")]
    fn new_fill_overflow_panics() {
        let _ = Image::new_fill(usize::MAX, 2, 0u8);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn texel_outside_image_panics() {
        let mut img = Image::new_fill(3, 2, 0u8);
        img.set(1, 1, 9);
        assert_eq!(img.texel(1, 1), 9);
        let _ = img.texel(3, 0);
    }
}
