use mp_core::Filterable;

/// Correlates `signal` with a symmetric `kernel`, producing only outputs whose
/// whole footprint lies inside `signal`.
///
/// `out.len()` must be `signal.len() - (kernel.len() - 1)`. Callers pad the
/// signal with an apron of `radius` clamped texels on each side, which is how
/// a thread-group tile sees its neighborhood.
pub fn convolve_valid<T: Filterable>(signal: &[T], kernel: &[f32], out: &mut [T]) {
    assert!(kernel.len() % 2 == 1, "kernel len must be 2*radius+1");
    assert!(
        signal.len() + 1 >= kernel.len(),
        "signal shorter than kernel footprint"
    );
    assert_eq!(
        out.len(),
        signal.len() + 1 - kernel.len(),
        "out must cover the valid region"
    );

    for (i, out_i) in out.iter_mut().enumerate() {
        let window = &signal[i..i + kernel.len()];
        let mut acc = window[0] * kernel[0];
        for (&s, &k) in window.iter().zip(kernel).skip(1) {
            acc = acc + s * k;
        }
        *out_i = acc;
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use crate::conv::convolve_valid;

    #[test]
    fn identity_kernel_copies_signal() {
        let signal = [1.0f32, 2.0, 3.0, 4.0];
        let mut out = [0.0f32; 4];
        convolve_valid(&signal, &[1.0], &mut out);
        assert_eq!(out, signal);
    }

    #[test]
    fn box_kernel_on_padded_signal() {
        // Clamp-padded [1, 2, 3] with radius 1.
        let signal = [1.0f32, 1.0, 2.0, 3.0, 3.0];
        let mut out = [0.0f32; 3];
        convolve_valid(&signal, &[1.0, 1.0, 1.0], &mut out);
        assert_eq!(out, [4.0, 6.0, 8.0]);
    }

    #[test]
    fn vec4_channels_are_independent() {
        let signal = [
            Vec4::new(1.0, 0.0, 2.0, 1.0),
            Vec4::new(3.0, 4.0, 2.0, 1.0),
            Vec4::new(1.0, 8.0, 2.0, 1.0),
        ];
        let mut out = [Vec4::ZERO; 1];
        convolve_valid(&signal, &[0.25, 0.5, 0.25], &mut out);
        assert_eq!(out[0], Vec4::new(2.0, 4.0, 2.0, 1.0));
    }
}
