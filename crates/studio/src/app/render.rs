use viewbridge::{MovementOutput, Vec3};

const BACKGROUND: [u8; 4] = [0x10, 0x14, 0x1c, 0xff];
const GRID: [u8; 4] = [0x1c, 0x22, 0x2e, 0xff];
const AVATAR: [u8; 4] = [0xe8, 0xb3, 0x4b, 0xff];
const AVATAR_AIRBORNE: [u8; 4] = [0xff, 0xe0, 0x9a, 0xff];
const FACING: [u8; 4] = [0xd0, 0xd6, 0xe0, 0xff];
const AXIS_BAR: [u8; 4] = [0x4b, 0x9f, 0xe8, 0xff];
const INACTIVE_DIM: [u8; 4] = [0x08, 0x08, 0x0a, 0xff];

const GRID_STEP_PX: u32 = 32;
const PIXELS_PER_UNIT: f32 = 24.0;
const AVATAR_HALF_SIZE_PX: i32 = 5;
const FACING_LINE_LENGTH_PX: f32 = 14.0;
const AXIS_BAR_HALF_WIDTH_PX: i32 = 40;

/// Paints one frame of the top-down studio view into an RGBA buffer.
///
/// An inactive viewport (not the engine's current render target) is drawn
/// as a dimmed empty surface, mirroring a real host that stops feeding it
/// frames.
pub(crate) fn draw_frame(
    frame: &mut [u8],
    width: u32,
    height: u32,
    active: bool,
    position: Vec3,
    yaw_degrees: f32,
    output: MovementOutput,
) {
    if !active {
        fill(frame, INACTIVE_DIM);
        return;
    }

    fill(frame, BACKGROUND);
    draw_grid(frame, width, height);

    let (center_x, center_y) = world_to_screen(position, width, height);
    let avatar_color = if position.y > 0.0 {
        AVATAR_AIRBORNE
    } else {
        AVATAR
    };
    fill_rect(
        frame,
        width,
        height,
        center_x - AVATAR_HALF_SIZE_PX,
        center_y - AVATAR_HALF_SIZE_PX,
        center_x + AVATAR_HALF_SIZE_PX,
        center_y + AVATAR_HALF_SIZE_PX,
        avatar_color,
    );
    draw_facing_line(frame, width, height, center_x, center_y, yaw_degrees);
    draw_axis_bars(frame, width, height, output);
}

fn fill(frame: &mut [u8], color: [u8; 4]) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&color);
    }
}

fn draw_grid(frame: &mut [u8], width: u32, height: u32) {
    for y in (0..height).step_by(GRID_STEP_PX as usize) {
        for x in 0..width {
            put_pixel(frame, width, height, x as i32, y as i32, GRID);
        }
    }
    for x in (0..width).step_by(GRID_STEP_PX as usize) {
        for y in 0..height {
            put_pixel(frame, width, height, x as i32, y as i32, GRID);
        }
    }
}

/// Maps the ground-plane position onto screen pixels, screen-centered with
/// +z pointing up.
pub(crate) fn world_to_screen(position: Vec3, width: u32, height: u32) -> (i32, i32) {
    let x = width as f32 / 2.0 + position.x * PIXELS_PER_UNIT;
    let y = height as f32 / 2.0 - position.z * PIXELS_PER_UNIT;
    (x as i32, y as i32)
}

fn draw_facing_line(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center_x: i32,
    center_y: i32,
    yaw_degrees: f32,
) {
    let (sin, cos) = yaw_degrees.to_radians().sin_cos();
    for step in 0..FACING_LINE_LENGTH_PX as i32 {
        let distance = step as f32;
        let x = center_x as f32 + -sin * distance;
        let y = center_y as f32 - cos * distance;
        put_pixel(frame, width, height, x as i32, y as i32, FACING);
    }
}

fn draw_axis_bars(frame: &mut [u8], width: u32, height: u32, output: MovementOutput) {
    let base_x = width as i32 / 2;
    let forward_y = height as i32 - 20;
    let sideways_y = height as i32 - 12;

    let forward_extent = (output.forward * AXIS_BAR_HALF_WIDTH_PX as f32) as i32;
    fill_rect(
        frame,
        width,
        height,
        base_x + forward_extent.min(0),
        forward_y - 2,
        base_x + forward_extent.max(0),
        forward_y + 2,
        AXIS_BAR,
    );

    // Positive sideways is a leftward strafe, so it extends leftward.
    let sideways_extent = (-output.sideways * AXIS_BAR_HALF_WIDTH_PX as f32) as i32;
    fill_rect(
        frame,
        width,
        height,
        base_x + sideways_extent.min(0),
        sideways_y - 2,
        base_x + sideways_extent.max(0),
        sideways_y + 2,
        AXIS_BAR,
    );
}

fn fill_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: [u8; 4],
) {
    for y in top..=bottom {
        for x in left..=right {
            put_pixel(frame, width, height, x, y, color);
        }
    }
}

fn put_pixel(frame: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return;
    }
    let index = (y as usize * width as usize + x as usize) * 4;
    if let Some(pixel) = frame.get_mut(index..index + 4) {
        pixel.copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_origin_maps_to_screen_center() {
        let (x, y) = world_to_screen(Vec3::default(), 640, 480);
        assert_eq!((x, y), (320, 240));
    }

    #[test]
    fn positive_z_moves_up_the_screen() {
        let position = Vec3 {
            x: 0.0,
            y: 0.0,
            z: 1.0,
        };
        let (_, y) = world_to_screen(position, 640, 480);
        assert!(y < 240);
    }

    #[test]
    fn out_of_bounds_pixels_are_discarded() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        put_pixel(&mut frame, 4, 4, -1, 0, AVATAR);
        put_pixel(&mut frame, 4, 4, 0, 17, AVATAR);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn inactive_frame_is_fully_dimmed() {
        let mut frame = vec![0u8; 8 * 8 * 4];
        draw_frame(
            &mut frame,
            8,
            8,
            false,
            Vec3::default(),
            0.0,
            MovementOutput::default(),
        );
        assert!(frame.chunks_exact(4).all(|pixel| pixel == &INACTIVE_DIM));
    }
}
