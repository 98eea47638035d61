//! Go sources shared by several test files.

/// Interfaces and concrete types with a mix of value receivers, pointer
/// receivers, embedding and generics.
pub const SHAPES: &str = r#"package shapes

type Shape interface {
	Area() float64
	Perimeter() float64
}

type Named interface {
	Name() string
}

type NamedShape interface {
	Shape
	Named
}

type Scaler interface {
	Scale(f float64)
}

type Square struct{ side float64 }

func (s Square) Area() float64      { return s.side * s.side }
func (s Square) Perimeter() float64 { return 4 * s.side }

type Circle struct{ r float64 }

func (c *Circle) Area() float64      { return 3 * c.r * c.r }
func (c *Circle) Perimeter() float64 { return 6 * c.r }
func (c *Circle) Scale(f float64)   { c.r *= f }
func (c *Circle) Name() string      { return "circle" }

type Labeled struct {
	Square
	label string
}

func (l Labeled) Name() string { return l.label }

type Box[T any] struct{ items []T }

func (b *Box[T]) Scale(f float64) {}
func (b *Box[T]) Name() string   { return "box" }

type Celsius float64

func (c Celsius) Name() string { return "celsius" }

type Empty struct{}
"#;

/// Calls through a function literal and between packages.
pub const CALLS: &str = r#"package calls

func leaf() int { return 1 }

func helper() int {
	return leaf() + leaf()
}

func outer() {
	run := func() {
		helper()
	}
	run()
	go func() { leaf() }()
}

var initial = helper()
"#;

/// A type satisfying the predeclared `error` interface.
pub const ERRORS: &str = r#"package errs

type NotFound struct{ name string }

func (e *NotFound) Error() string { return e.name + " not found" }

type Coded interface {
	error
	Code() int
}
"#;
