/// Stable u32-key radix sort for SoA (inds/vals).
/// - Sorts by inds ascending
/// - Reorders vals accordingly
///
/// Used to put sparse feature vectors in canonical index order, so two vectors
/// built from the same text compare equal regardless of token order.
///
/// Complexity: 4 passes, each O(n + 256)
pub fn radix_sort_u32_soa<N: Copy>(inds: &mut [u32], vals: &mut [N]) {
    assert_eq!(inds.len(), vals.len());
    let n = inds.len();
    if n <= 1 {
        return;
    }

    // small sizes: insertion sort beats allocating scratch
    if n <= 32 {
        insertion_sort_u32_soa(inds, vals);
        return;
    }

    let mut src: Vec<(u32, N)> = inds.iter().copied().zip(vals.iter().copied()).collect();
    let mut dst: Vec<(u32, N)> = src.clone();

    // LSD, byte 0..3
    for shift in [0u32, 8, 16, 24] {
        let mut count = [0usize; 256];
        for &(k, _) in src.iter() {
            count[((k >> shift) & 0xFF) as usize] += 1;
        }
        // all keys share this byte, nothing to move
        if count.iter().any(|&c| c == n) {
            continue;
        }

        let mut sum = 0usize;
        for c in count.iter_mut() {
            let tmp = *c;
            *c = sum;
            sum += tmp;
        }

        for &pair in src.iter() {
            let b = ((pair.0 >> shift) & 0xFF) as usize;
            dst[count[b]] = pair;
            count[b] += 1;
        }
        std::mem::swap(&mut src, &mut dst);
    }

    for (i, (k, v)) in src.into_iter().enumerate() {
        inds[i] = k;
        vals[i] = v;
    }
}

/// Tiny insertion sort for small n (SoA).
#[inline(always)]
fn insertion_sort_u32_soa<N: Copy>(inds: &mut [u32], vals: &mut [N]) {
    let n = inds.len();
    for i in 1..n {
        let mut j = i;
        while j > 0 && inds[j] < inds[j - 1] {
            inds.swap(j, j - 1);
            vals.swap(j, j - 1);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// stable baseline: sort by (key, original_index)
    fn baseline_stable_sort<N: Copy>(inds: &[u32], vals: &[N]) -> (Vec<u32>, Vec<N>) {
        let mut pairs: Vec<(u32, usize, N)> = inds
            .iter()
            .copied()
            .enumerate()
            .map(|(i, k)| (k, i, vals[i]))
            .collect();
        pairs.sort_unstable_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        pairs.into_iter().map(|(k, _, v)| (k, v)).unzip()
    }

    /// tiny deterministic PRNG (xorshift32)
    struct Rng(u32);
    impl Rng {
        fn new(seed: u32) -> Self { Self(seed) }
        fn next_u32(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    #[test]
    fn handles_empty_and_single() {
        let mut inds: Vec<u32> = vec![];
        let mut vals: Vec<u32> = vec![];
        radix_sort_u32_soa(&mut inds, &mut vals);
        assert!(inds.is_empty());

        let mut inds = vec![42u32];
        let mut vals = vec![7u32];
        radix_sort_u32_soa(&mut inds, &mut vals);
        assert_eq!((inds, vals), (vec![42], vec![7]));
    }

    #[test]
    fn matches_baseline_many_sizes() {
        let mut rng = Rng::new(0x1234_5678);
        for &n in &[2usize, 7, 31, 32, 33, 64, 129, 1024] {
            let mut inds = Vec::with_capacity(n);
            let mut vals = Vec::with_capacity(n);
            for i in 0..n {
                inds.push(rng.next_u32() & 0x00FF_FFFF);
                vals.push(i as u32);
            }
            let (base_k, base_v) = baseline_stable_sort(&inds, &vals);
            radix_sort_u32_soa(&mut inds, &mut vals);
            assert_eq!(inds, base_k, "keys mismatch at n={n}");
            assert_eq!(vals, base_v, "vals mismatch at n={n}");
        }
    }

    #[test]
    fn extremes_and_shared_bytes() {
        let mut inds: Vec<u32> = vec![0, u32::MAX, 1, u32::MAX - 1, 0, 2, u32::MAX];
        inds.extend((0..40u32).map(|i| 5000 - i));
        let mut vals: Vec<u32> = (0..inds.len() as u32).collect();
        let (base_k, base_v) = baseline_stable_sort(&inds, &vals);
        radix_sort_u32_soa(&mut inds, &mut vals);
        assert_eq!(inds, base_k);
        assert_eq!(vals, base_v);
    }
}
