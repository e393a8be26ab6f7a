use std::mem::size_of;

use crate::{Error, Result, pods::BatchVertex};

use super::TexturedQuad;

/// Two triangles: v0 v1 v2, v0 v2 v3.
pub type Quad = [BatchVertex; 6];

pub const VERTICES_PER_QUAD: usize = 6;

/// CPU side staging of quads with a fixed capacity.
#[derive(Debug)]
pub struct BatchBuffer {
    quads: Vec<Quad>,
    capacity: usize,
}

impl BatchBuffer {
    /// Reserves room for `capacity` quads.
    ///
    /// The vertex count of a full buffer has to fit a `u32` draw range.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_format("batch capacity must be positive"));
        }
        let vertices = capacity
            .checked_mul(VERTICES_PER_QUAD)
            .filter(|&vertices| u32::try_from(vertices).is_ok());
        let bytes = capacity.checked_mul(size_of::<Quad>());
        if vertices.is_none() || bytes.is_none() {
            return Err(Error::not_enough_memory(format!(
                "a batch of {capacity} quads exceeds the addressable vertex range"
            )));
        }

        let mut quads = Vec::new();
        quads.try_reserve_exact(capacity).map_err(|_| {
            Error::not_enough_memory(format!("cannot allocate a batch of {capacity} quads"))
        })?;

        Ok(Self { quads, capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity * size_of::<Quad>()
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.quads.len() == self.capacity
    }

    /// Appends a quad. The buffer must not be full.
    pub fn push(&mut self, quad: &TexturedQuad) {
        assert!(!self.is_full(), "batch buffer overflow");
        self.quads.push(quad_vertices(quad));
    }

    /// The pending quads as vertex bytes. Resets the buffer.
    pub fn take_for_flush(&mut self) -> Flush<'_> {
        Flush { buffer: self }
    }
}

/// The pending quads of a [`BatchBuffer`]. The buffer is empty after this is dropped.
pub struct Flush<'a> {
    buffer: &'a mut BatchBuffer,
}

impl Flush<'_> {
    pub fn quad_count(&self) -> usize {
        self.buffer.quads.len()
    }

    pub fn triangle_count(&self) -> u32 {
        (self.quad_count() * 2) as u32
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.buffer.quads)
    }
}

impl Drop for Flush<'_> {
    fn drop(&mut self) {
        self.buffer.quads.clear();
    }
}

fn quad_vertices(quad: &TexturedQuad) -> Quad {
    let TexturedQuad {
        start_pos: p0,
        start_uv: t0,
        end_pos: p2,
        end_uv: t2,
        color,
    } = *quad;

    let v0 = BatchVertex::new(p0, t0, color);
    let v1 = BatchVertex::new(p0.with_x(p2.x), t0.with_x(t2.x), color);
    let v2 = BatchVertex::new(p2, t2, color);
    let v3 = BatchVertex::new(p0.with_y(p2.y), t0.with_y(t2.y), color);

    [v0, v1, v2, v0, v2, v3]
}

#[cfg(test)]
mod tests {
    use boxworld_geometry::{Color, Point};

    use super::*;
    use crate::ErrorKind;

    fn quad(x: f64) -> TexturedQuad {
        TexturedQuad {
            start_pos: Point::new(x, 2.0),
            start_uv: Point::new(0.0, 0.25),
            end_pos: Point::new(x + 10.0, 12.0),
            end_uv: Point::new(0.5, 0.75),
            color: Color::rgb(1.0, 0.5, 0.0),
        }
    }

    #[test]
    fn quad_is_two_triangles_sharing_the_diagonal() {
        let vertices = quad_vertices(&quad(1.0));
        let positions: Vec<[f32; 2]> = vertices.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![
                [1.0, 2.0],
                [11.0, 2.0],
                [11.0, 12.0],
                [1.0, 2.0],
                [11.0, 12.0],
                [1.0, 12.0]
            ]
        );
        assert_eq!(vertices[1].tex_coords, [0.5, 0.25]);
        assert_eq!(vertices[5].tex_coords, [0.0, 0.75]);
        assert!(vertices.iter().all(|v| v.color == [1.0, 0.5, 0.0, 1.0]));
    }

    #[test]
    fn flush_empties_the_buffer() {
        let mut buffer = BatchBuffer::new(2).unwrap();
        buffer.push(&quad(0.0));
        buffer.push(&quad(1.0));
        assert!(buffer.is_full());

        {
            let flush = buffer.take_for_flush();
            assert_eq!(flush.quad_count(), 2);
            assert_eq!(flush.triangle_count(), 4);
            assert_eq!(flush.as_bytes().len(), 2 * VERTICES_PER_QUAD * 32);
        }

        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity_bytes(), 2 * 6 * 32);
    }

    #[test]
    fn rejects_unusable_capacities() {
        let kind = |capacity| BatchBuffer::new(capacity).map(|_| ()).unwrap_err().kind();
        assert_eq!(kind(0), ErrorKind::InvalidFormat);
        assert_eq!(kind(usize::MAX / 64), ErrorKind::NotEnoughMemory);
        assert_eq!(kind(u32::MAX as usize), ErrorKind::NotEnoughMemory);
    }

    #[test]
    #[should_panic]
    fn pushing_into_a_full_buffer_panics() {
        let mut buffer = BatchBuffer::new(1).unwrap();
        buffer.push(&quad(0.0));
        buffer.push(&quad(1.0));
    }
}
